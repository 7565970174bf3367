use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RenameError;

// ---------------------------------------------------------------------------
// VariableKey – stable identity of a measured variable
// ---------------------------------------------------------------------------

/// The 11 variable slots. The serialized form is the stable key used by
/// sessions and import profiles; it never changes when the user renames
/// a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VariableKey {
    Uv,
    Ph,
    Conductivity,
    SystemPressure,
    Gradient,
    FlowRate,
    Fraction,
    Injection,
    PreColumnPressure,
    Variable1,
    Variable2,
}

impl VariableKey {
    /// All slots in settings order (the order of the positional name/unit fields).
    pub const ALL: [VariableKey; 11] = [
        VariableKey::Uv,
        VariableKey::Ph,
        VariableKey::Conductivity,
        VariableKey::SystemPressure,
        VariableKey::Gradient,
        VariableKey::FlowRate,
        VariableKey::Fraction,
        VariableKey::Injection,
        VariableKey::PreColumnPressure,
        VariableKey::Variable1,
        VariableKey::Variable2,
    ];

    /// Order in which the slots are offered for plotting.
    pub const SELECTION_ORDER: [VariableKey; 11] = [
        VariableKey::Uv,
        VariableKey::Ph,
        VariableKey::Conductivity,
        VariableKey::Gradient,
        VariableKey::FlowRate,
        VariableKey::SystemPressure,
        VariableKey::PreColumnPressure,
        VariableKey::Injection,
        VariableKey::Variable1,
        VariableKey::Variable2,
        VariableKey::Fraction,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Factory-default display name.
    pub fn default_name(self) -> &'static str {
        match self {
            VariableKey::Uv => "UV",
            VariableKey::Ph => "pH",
            VariableKey::Conductivity => "Conductivity",
            VariableKey::SystemPressure => "System Pressure",
            VariableKey::Gradient => "Gradient",
            VariableKey::FlowRate => "Flow rate",
            VariableKey::Fraction => "Fraction",
            VariableKey::Injection => "Injection",
            VariableKey::PreColumnPressure => "Pre-column Pressure",
            VariableKey::Variable1 => "Variable 1",
            VariableKey::Variable2 => "Variable 2",
        }
    }

    /// Factory-default unit suffix (appended verbatim to axis labels).
    pub fn default_unit(self) -> &'static str {
        match self {
            VariableKey::Uv => " (mAU)",
            VariableKey::Ph => "",
            VariableKey::Conductivity => " (mS/cm)",
            VariableKey::SystemPressure => " (MPa)",
            VariableKey::Gradient => "%",
            VariableKey::FlowRate => " (mL/min)",
            VariableKey::Fraction => "Fraction",
            VariableKey::Injection => " (mL/min)",
            VariableKey::PreColumnPressure => " (MPa)",
            VariableKey::Variable1 | VariableKey::Variable2 => "",
        }
    }

    pub fn is_fraction(self) -> bool {
        self == VariableKey::Fraction
    }
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.default_name())
    }
}

// ---------------------------------------------------------------------------
// VariableRegistry – display names and units
// ---------------------------------------------------------------------------

/// User-facing names and units for every slot, indexed by [`VariableKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct VariableRegistry {
    names: [String; 11],
    units: [String; 11],
}

impl Default for VariableRegistry {
    fn default() -> Self {
        Self {
            names: VariableKey::ALL.map(|k| k.default_name().to_string()),
            units: VariableKey::ALL.map(|k| k.default_unit().to_string()),
        }
    }
}

impl VariableRegistry {
    /// Build from positional name/unit lists. Missing entries keep their defaults.
    pub fn from_lists(names: &[String], units: &[String]) -> Self {
        let mut registry = Self::default();
        for key in VariableKey::ALL {
            if let Some(name) = names.get(key.index()).filter(|n| !n.trim().is_empty()) {
                registry.names[key.index()] = name.clone();
            }
            if let Some(unit) = units.get(key.index()) {
                registry.units[key.index()] = unit.clone();
            }
        }
        registry
    }

    pub fn name(&self, key: VariableKey) -> &str {
        &self.names[key.index()]
    }

    pub fn unit(&self, key: VariableKey) -> &str {
        &self.units[key.index()]
    }

    /// Axis label: display name followed by the unit suffix.
    pub fn label(&self, key: VariableKey) -> String {
        format!("{}{}", self.name(key), self.unit(key))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn units(&self) -> &[String] {
        &self.units
    }

    /// Reverse lookup, display name → stable key.
    pub fn key_for_name(&self, name: &str) -> Option<VariableKey> {
        VariableKey::ALL
            .into_iter()
            .find(|k| self.names[k.index()] == name)
    }

    /// Apply a set of renames in one step. Names must be unique across the
    /// final set; a slot outside `active` that still holds a claimed name is
    /// moved to a free name instead of blocking the rename. Returns the slots
    /// whose names changed. On error nothing is modified.
    pub fn rename_all(
        &mut self,
        renames: &[(VariableKey, String)],
        active: &[VariableKey],
    ) -> Result<Vec<VariableKey>, RenameError> {
        let mut names = self.names.clone();
        let mut claimed = [false; 11];
        for (key, name) in renames {
            let name = name.trim();
            if name.is_empty() {
                return Err(RenameError::EmptyName { key: *key });
            }
            names[key.index()] = name.to_string();
            claimed[key.index()] = true;
        }

        for (i, &key) in VariableKey::ALL.iter().enumerate() {
            for &other in &VariableKey::ALL[i + 1..] {
                if claimed[key.index()] && claimed[other.index()] && names[key.index()] == names[other.index()] {
                    return Err(RenameError::NameInUse {
                        name: names[key.index()].clone(),
                        holder: key,
                    });
                }
            }
        }

        for key in VariableKey::ALL {
            if claimed[key.index()] {
                continue;
            }
            let clashes = VariableKey::ALL
                .into_iter()
                .any(|other| claimed[other.index()] && names[other.index()] == names[key.index()]);
            if !clashes {
                continue;
            }
            if active.contains(&key) {
                return Err(RenameError::NameInUse {
                    name: names[key.index()].clone(),
                    holder: key,
                });
            }
            names[key.index()] = free_name(&names, key);
        }

        let changed = VariableKey::ALL
            .into_iter()
            .filter(|k| names[k.index()] != self.names[k.index()])
            .collect();
        self.names = names;
        Ok(changed)
    }

    /// Change only the unit suffix shown in labels.
    pub fn retarget_units(&mut self, key: VariableKey, new_unit: &str) {
        self.units[key.index()] = new_unit.to_string();
    }
}

/// The default name of `key`, or that name with the first free `(n)` suffix.
fn free_name(names: &[String; 11], key: VariableKey) -> String {
    let taken = |candidate: &str| names.iter().any(|n| n == candidate);
    let base = key.default_name();
    if !taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base} ({n})"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
