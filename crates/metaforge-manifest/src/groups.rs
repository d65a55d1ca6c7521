//! Built-in configuration layer groups and override resolution.
//!
//! The five group tables drive the section contents of the generated
//! `bblayers.conf`. Each table maps a group-layer name to its path relative to
//! the sources directory, in a fixed order. The built-in defaults are
//! immutable; a structured manifest document may replace any table wholesale
//! (never entry-by-entry).

/// Ordered group-layer-name → relative-path table.
pub type GroupTable = Vec<(String, String)>;

/// Recipe-metadata layers without machine or distro content.
const BASE_LAYERS: &[(&str, &str)] = &[
    ("meta-oe", "meta-openembedded/meta-oe"),
    ("meta-efl", "meta-openembedded/meta-efl"),
    ("meta-gpe", "meta-openembedded/meta-gpe"),
    ("meta-gnome", "meta-openembedded/meta-gnome"),
    ("meta-xfce", "meta-openembedded/meta-xfce"),
    ("meta-initramfs", "meta-openembedded/meta-initramfs"),
    ("toolchain-layer", "meta-openembedded/toolchain-layer"),
    ("meta-multimedia", "meta-openembedded/meta-multimedia"),
    ("meta-networking", "meta-openembedded/meta-networking"),
    ("meta-webserver", "meta-openembedded/meta-webserver"),
    ("meta-ruby", "meta-openembedded/meta-ruby"),
    ("meta-filesystems", "meta-openembedded/meta-filesystems"),
    ("meta-perl", "meta-openembedded/meta-perl"),
    ("meta-kde", "meta-kde"),
    ("meta-opie", "meta-opie"),
    ("meta-java", "meta-java"),
    ("meta-browser", "meta-browser"),
    ("meta-mono", "meta-mono"),
    ("meta-qt5", "meta-qt5"),
    ("meta-systemd", "meta-openembedded/meta-systemd"),
    ("meta-ros", "meta-ros"),
];

/// Board support package layers.
const BSP_LAYERS: &[(&str, &str)] = &[
    ("common-bsp", "meta-beagleboard/common-bsp"),
    ("meta-ti", "meta-ti"),
    ("meta-fsl-arm", "meta-fsl-arm"),
    ("meta-fsl-arm-extra", "meta-fsl-arm-extra"),
    ("meta-nslu2", "meta-nslu2"),
    ("meta-htc", "meta-smartphone/meta-htc"),
    ("meta-nokia", "meta-smartphone/meta-nokia"),
    ("meta-openmoko", "meta-smartphone/meta-openmoko"),
    ("meta-palm", "meta-smartphone/meta-palm"),
    ("meta-handheld", "meta-handheld"),
    ("meta-intel", "meta-intel"),
    ("meta-sugarbay", "meta-intel/meta-sugarbay"),
    ("meta-crownbay", "meta-intel/meta-crownbay"),
    ("meta-emenlow", "meta-intel/meta-emenlow"),
    ("meta-fri2", "meta-intel/meta-fri2"),
    ("meta-jasperforest", "meta-intel/meta-jasperforest"),
    ("meta-n450", "meta-intel/meta-n450"),
    ("meta-sunxi", "meta-sunxi"),
    ("meta-raspberrypi", "meta-raspberrypi"),
    ("meta-minnow", "meta-minnow"),
    ("meta-dominion", "meta-dominion"),
];

/// Overlay layers appended after base and BSP content.
const EXTRA_LAYERS: &[(&str, &str)] = &[
    ("meta-linaro", "meta-linaro/meta-linaro"),
    ("meta-linaro-toolchain", "meta-linaro/meta-linaro-toolchain"),
    ("meta-beagleboard-extras", "meta-beagleboard/meta-beagleboard-extras"),
];

const OS_LAYERS: &[(&str, &str)] = &[("meta-angstrom", "meta-angstrom")];

const OE_CORE_LAYERS: &[(&str, &str)] = &[("meta", "openembedded-core/meta")];

/// Optional wholesale replacements for the built-in group tables, parsed from
/// the structured manifest document's `layers` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupOverrides {
    pub base: Option<GroupTable>,
    pub bsp: Option<GroupTable>,
    pub extra: Option<GroupTable>,
    pub os: Option<GroupTable>,
    pub oe_core: Option<GroupTable>,
}

impl GroupOverrides {
    pub fn is_empty(&self) -> bool {
        self.base.is_none()
            && self.bsp.is_none()
            && self.extra.is_none()
            && self.os.is_none()
            && self.oe_core.is_none()
    }
}

/// The effective layer-group tables used for configuration rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerGroups {
    pub base: GroupTable,
    pub bsp: GroupTable,
    pub extra: GroupTable,
    pub os: GroupTable,
    pub oe_core: GroupTable,
}

fn to_table(entries: &[(&str, &str)]) -> GroupTable {
    entries
        .iter()
        .map(|(name, path)| ((*name).to_owned(), (*path).to_owned()))
        .collect()
}

impl LayerGroups {
    /// The built-in default tables.
    pub fn builtin() -> Self {
        Self {
            base: to_table(BASE_LAYERS),
            bsp: to_table(BSP_LAYERS),
            extra: to_table(EXTRA_LAYERS),
            os: to_table(OS_LAYERS),
            oe_core: to_table(OE_CORE_LAYERS),
        }
    }

    /// Apply document overrides on top of the built-in defaults. Each present
    /// override replaces its table wholesale.
    pub fn resolve(overrides: &GroupOverrides) -> Self {
        let builtin = Self::builtin();
        Self {
            base: overrides.base.clone().unwrap_or(builtin.base),
            bsp: overrides.bsp.clone().unwrap_or(builtin.bsp),
            extra: overrides.extra.clone().unwrap_or(builtin.extra),
            os: overrides.os.clone().unwrap_or(builtin.os),
            oe_core: overrides.oe_core.clone().unwrap_or(builtin.oe_core),
        }
    }
}
