//! Classification and kind inference tables
//!
//! Both tables are ordered lists evaluated top-down, first match wins. The
//! built-in tables cover the identities known to ship on FreeWili hardware;
//! anything else (badge product ids, custom product names) is supplied as a
//! TOML rule file:
//!
//! ```toml
//! extends_builtin = true
//!
//! [[classify]]
//! kind = "SerialMain"
//! ids = ["0x093c:0x2057"]
//!
//! [[infer]]
//! kind = "Winky"
//! requires = ["SerialMain"]
//! signature = { ids = ["0x093c:0x2057"] }
//! ```

use crate::error::RuleError;
use model::ids::*;
use model::node::{CLASS_CDC, CLASS_CDC_DATA, CLASS_HUB, CLASS_MASS_STORAGE};
use model::{ClassifiedUsbNode, DeviceKind, RawUsbNode, UsbDeviceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::info;

static BUILTIN: LazyLock<RuleSet> = LazyLock::new(RuleSet::builtin_tables);

/// VID:PID filter, `*` matches any value
///
/// Written as `"0x1234:0x5678"`, `"0x1234:*"` or `"*:0x5678"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UsbIdFilter {
    vid: Option<u16>,
    pid: Option<u16>,
}

impl UsbIdFilter {
    /// Filter matching exactly one VID:PID pair
    pub const fn exact(vid: u16, pid: u16) -> Self {
        Self {
            vid: Some(vid),
            pid: Some(pid),
        }
    }

    /// Filter matching every product of a vendor
    pub const fn vendor(vid: u16) -> Self {
        Self {
            vid: Some(vid),
            pid: None,
        }
    }

    pub fn matches(&self, vid: u16, pid: u16) -> bool {
        self.vid.is_none_or(|v| v == vid) && self.pid.is_none_or(|p| p == pid)
    }

    /// True for `*:*`
    pub fn is_wildcard(&self) -> bool {
        self.vid.is_none() && self.pid.is_none()
    }

    fn parse_half(filter: &str, part: &str, name: &str) -> Result<Option<u16>, RuleError> {
        if part == "*" {
            return Ok(None);
        }
        let invalid = |reason: String| RuleError::InvalidFilter {
            filter: filter.to_string(),
            reason,
        };
        let hex = part
            .strip_prefix("0x")
            .or_else(|| part.strip_prefix("0X"))
            .ok_or_else(|| invalid(format!("{} '{}' must start with '0x'", name, part)))?;
        if hex.is_empty() || hex.len() > 4 {
            return Err(invalid(format!("{} '{}' must have 1-4 hex digits", name, part)));
        }
        u16::from_str_radix(hex, 16)
            .map(Some)
            .map_err(|_| invalid(format!("{} '{}' is not a valid hex number", name, part)))
    }
}

impl FromStr for UsbIdFilter {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (vid, pid) = s.split_once(':').ok_or_else(|| RuleError::InvalidFilter {
            filter: s.to_string(),
            reason: "expected VID:PID (e.g. '0x1234:0x5678' or '0x1234:*')".to_string(),
        })?;
        if pid.contains(':') {
            return Err(RuleError::InvalidFilter {
                filter: s.to_string(),
                reason: "too many ':' separators".to_string(),
            });
        }
        Ok(Self {
            vid: Self::parse_half(s, vid, "VID")?,
            pid: Self::parse_half(s, pid, "PID")?,
        })
    }
}

impl TryFrom<String> for UsbIdFilter {
    type Error = RuleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UsbIdFilter> for String {
    fn from(filter: UsbIdFilter) -> Self {
        filter.to_string()
    }
}

impl fmt::Display for UsbIdFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.vid {
            Some(vid) => write!(f, "{:#06x}:", vid)?,
            None => f.write_str("*:")?,
        }
        match self.pid {
            Some(pid) => write!(f, "{:#06x}", pid),
            None => f.write_str("*"),
        }
    }
}

/// Match criteria against a raw node
///
/// Every non-empty field must hold; within a field any entry may match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCriteria {
    /// VID:PID filters
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<UsbIdFilter>,
    /// Device or interface class codes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<u8>,
    /// Product name substrings, ASCII case-insensitive
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub product_contains: Vec<String>,
}

impl NodeCriteria {
    /// True if every node matches, e.g. no criteria or only `*:*`
    pub fn is_unconditional(&self) -> bool {
        let any_id = self.ids.is_empty() || self.ids.iter().any(UsbIdFilter::is_wildcard);
        let any_product =
            self.product_contains.is_empty() || self.product_contains.iter().any(String::is_empty);
        any_id && any_product && self.classes.is_empty()
    }

    pub fn matches(&self, node: &RawUsbNode) -> bool {
        let id_match = self.ids.is_empty()
            || self
                .ids
                .iter()
                .any(|f| f.matches(node.vendor_id, node.product_id));
        let class_match =
            self.classes.is_empty() || self.classes.iter().any(|c| node.has_class(*c));
        id_match && class_match && self.product_match(&node.product)
    }

    fn product_match(&self, product: &str) -> bool {
        if self.product_contains.is_empty() {
            return true;
        }
        let product = product.to_ascii_lowercase();
        self.product_contains
            .iter()
            .any(|needle| product.contains(&needle.to_ascii_lowercase()))
    }
}

/// One row of the classification table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub kind: UsbDeviceKind,
    #[serde(flatten)]
    pub criteria: NodeCriteria,
}

/// One row of the kind inference table
///
/// Matches a group when every kind in `requires` is present and, if a
/// signature is given, at least one member matches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindRule {
    pub kind: DeviceKind,
    #[serde(default)]
    pub requires: Vec<UsbDeviceKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<NodeCriteria>,
}

impl KindRule {
    pub fn matches(
        &self,
        present: &BTreeSet<UsbDeviceKind>,
        members: &[ClassifiedUsbNode],
    ) -> bool {
        self.requires.iter().all(|kind| present.contains(kind))
            && self.signature.as_ref().is_none_or(|signature| {
                members
                    .iter()
                    .any(|member| signature.matches(member.raw_node()))
            })
    }
}

/// Rule file layout
#[derive(Debug, Deserialize)]
struct RuleFile {
    /// Evaluate these rules before the built-in ones instead of replacing them
    #[serde(default)]
    extends_builtin: bool,
    #[serde(default)]
    classify: Vec<ClassificationRule>,
    #[serde(default)]
    infer: Vec<KindRule>,
}

/// Ordered classification and kind inference tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub classify: Vec<ClassificationRule>,
    #[serde(default)]
    pub infer: Vec<KindRule>,
}

impl RuleSet {
    /// The built-in tables, shared and immutable
    pub fn builtin() -> &'static RuleSet {
        &BUILTIN
    }

    /// Parse a rule table from TOML and validate it
    pub fn from_toml_str(content: &str) -> Result<Self, RuleError> {
        let file: RuleFile = toml::from_str(content)?;
        let mut rules = Self {
            classify: file.classify,
            infer: file.infer,
        };
        if file.extends_builtin {
            let builtin = Self::builtin();
            rules.classify.extend(builtin.classify.iter().cloned());
            rules.infer.extend(builtin.infer.iter().cloned());
        }
        rules.validate()?;
        Ok(rules)
    }

    /// Load a rule table file
    pub fn load(path: &Path) -> Result<Self, RuleError> {
        let content = fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = Self::from_toml_str(&content)?;
        info!(
            "Loaded {} classification and {} inference rules from {}",
            rules.classify.len(),
            rules.infer.len(),
            path.display()
        );
        Ok(rules)
    }

    /// Check that no rule matches unconditionally
    pub fn validate(&self) -> Result<(), RuleError> {
        for (index, rule) in self.classify.iter().enumerate() {
            if rule.criteria.is_unconditional() {
                return Err(RuleError::EmptyCriteria {
                    table: "classify",
                    index,
                });
            }
        }
        for (index, rule) in self.infer.iter().enumerate() {
            if rule.kind == DeviceKind::Unknown {
                return Err(RuleError::FallbackKind { index });
            }
            let has_signature = rule.signature.as_ref().is_some_and(|s| !s.is_unconditional());
            if rule.requires.is_empty() && !has_signature {
                return Err(RuleError::EmptyCriteria {
                    table: "infer",
                    index,
                });
            }
        }
        Ok(())
    }

    fn builtin_tables() -> Self {
        let serial_classes = vec![CLASS_CDC, CLASS_CDC_DATA];
        let uf2_ids = vec![
            UsbIdFilter::exact(USB_VID_RPI, USB_PID_RPI_2040_UF2),
            UsbIdFilter::exact(USB_VID_RPI, USB_PID_RPI_2350_UF2),
        ];

        let classify = vec![
            ClassificationRule {
                kind: UsbDeviceKind::Hub,
                criteria: NodeCriteria {
                    classes: vec![CLASS_HUB],
                    ..Default::default()
                },
            },
            ClassificationRule {
                kind: UsbDeviceKind::Esp32,
                criteria: NodeCriteria {
                    ids: vec![
                        UsbIdFilter::exact(USB_VID_ESPRESSIF, USB_PID_ESP32_SERIAL_JTAG),
                        UsbIdFilter::exact(USB_VID_ESPRESSIF, USB_PID_ESP32_CDC),
                    ],
                    ..Default::default()
                },
            },
            ClassificationRule {
                kind: UsbDeviceKind::Ftdi,
                criteria: NodeCriteria {
                    ids: vec![UsbIdFilter::exact(USB_VID_FW_FTDI, USB_PID_FW_FTDI)],
                    ..Default::default()
                },
            },
            ClassificationRule {
                kind: UsbDeviceKind::MassStorage,
                criteria: NodeCriteria {
                    classes: vec![CLASS_MASS_STORAGE],
                    ..Default::default()
                },
            },
            ClassificationRule {
                kind: UsbDeviceKind::MassStorage,
                criteria: NodeCriteria {
                    ids: uf2_ids.clone(),
                    ..Default::default()
                },
            },
            ClassificationRule {
                kind: UsbDeviceKind::SerialMain,
                criteria: NodeCriteria {
                    classes: serial_classes.clone(),
                    product_contains: vec!["main".to_string()],
                    ..Default::default()
                },
            },
            ClassificationRule {
                kind: UsbDeviceKind::SerialDisplay,
                criteria: NodeCriteria {
                    classes: serial_classes.clone(),
                    product_contains: vec!["display".to_string()],
                    ..Default::default()
                },
            },
            ClassificationRule {
                kind: UsbDeviceKind::Serial,
                criteria: NodeCriteria {
                    classes: serial_classes,
                    ..Default::default()
                },
            },
            ClassificationRule {
                kind: UsbDeviceKind::Serial,
                criteria: NodeCriteria {
                    ids: vec![UsbIdFilter::exact(USB_VID_RPI, USB_PID_RPI_CDC)],
                    ..Default::default()
                },
            },
        ];

        let infer = vec![
            KindRule {
                kind: DeviceKind::Uf2,
                requires: vec![UsbDeviceKind::MassStorage],
                signature: Some(NodeCriteria {
                    ids: uf2_ids,
                    ..Default::default()
                }),
            },
            KindRule {
                kind: DeviceKind::FreeWili,
                requires: vec![
                    UsbDeviceKind::Esp32,
                    UsbDeviceKind::SerialMain,
                    UsbDeviceKind::SerialDisplay,
                ],
                signature: None,
            },
            KindRule {
                kind: DeviceKind::FreeWili,
                requires: vec![UsbDeviceKind::SerialMain, UsbDeviceKind::SerialDisplay],
                signature: None,
            },
            KindRule {
                kind: DeviceKind::FreeWili,
                requires: vec![UsbDeviceKind::Hub, UsbDeviceKind::Ftdi],
                signature: Some(NodeCriteria {
                    ids: vec![UsbIdFilter::exact(USB_VID_FW_HUB, USB_PID_FW_HUB)],
                    ..Default::default()
                }),
            },
        ];

        Self { classify, infer }
    }
}
