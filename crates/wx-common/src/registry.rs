//! Session-owned lookup tables: units, color schemes and named styles.
//!
//! Everything that resolves styles or units takes a `&Registry`, so two
//! sessions with different style sets never observe each other.

use crate::style::{ColorStyle, StrictStyle, BASE_STYLE};
use crate::units::{builtin_units, UnitConverter, UnitDef};
use crate::WxResult;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

/// Name of the scheme used when a style names an unknown one.
pub const DEFAULT_SCHEME: &str = "default";

/// Serializable registry additions (JSON or YAML).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryDocument {
    pub styles: HashMap<String, ColorStyle>,
    pub color_schemes: HashMap<String, Vec<String>>,
    pub units: HashMap<String, UnitDef>,
}

/// Units, color schemes and styles available to one session.
#[derive(Debug, Clone)]
pub struct Registry {
    units: HashMap<String, UnitDef>,
    schemes: HashMap<String, Vec<String>>,
    styles: HashMap<String, ColorStyle>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Registry holding the built-in units, schemes and the `base` style.
    pub fn new() -> Self {
        let mut styles = HashMap::new();
        styles.insert(BASE_STYLE.to_string(), StrictStyle::default().to_partial());
        Self {
            units: builtin_units(),
            schemes: builtin_schemes(),
            styles,
        }
    }

    /// Parse a registry document from JSON and merge it into a fresh registry.
    pub fn from_json(json: &str) -> WxResult<Self> {
        let doc: RegistryDocument = serde_json::from_str(json)?;
        let mut registry = Self::new();
        registry.extend(doc);
        Ok(registry)
    }

    /// Parse a registry document from YAML and merge it into a fresh registry.
    pub fn from_yaml(yaml: &str) -> WxResult<Self> {
        let doc: RegistryDocument = serde_yaml::from_str(yaml)?;
        let mut registry = Self::new();
        registry.extend(doc);
        Ok(registry)
    }

    /// Load a registry document from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> WxResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    /// Merge a document; later entries replace earlier ones of the same name.
    pub fn extend(&mut self, doc: RegistryDocument) {
        self.units.extend(doc.units);
        self.schemes.extend(doc.color_schemes);
        for (name, style) in doc.styles {
            self.add_style(name, style);
        }
    }

    pub fn add_style(&mut self, name: impl Into<String>, style: ColorStyle) {
        self.styles.insert(name.into(), style);
    }

    pub fn add_unit(&mut self, name: impl Into<String>, unit: UnitDef) {
        self.units.insert(name.into(), unit);
    }

    pub fn add_scheme(&mut self, name: impl Into<String>, colors: Vec<String>) {
        self.schemes.insert(name.into(), colors);
    }

    pub fn style(&self, name: &str) -> Option<&ColorStyle> {
        self.styles.get(name)
    }

    pub fn style_names(&self) -> impl Iterator<Item = &str> {
        self.styles.keys().map(String::as_str)
    }

    pub fn unit(&self, name: &str) -> Option<&UnitDef> {
        self.units.get(name)
    }

    /// Color list of a named scheme.
    pub fn scheme(&self, name: &str) -> Option<&[String]> {
        self.schemes.get(name).map(Vec::as_slice)
    }

    /// Color list of a named scheme, falling back to the default scheme.
    pub fn scheme_or_default(&self, name: &str) -> &[String] {
        if let Some(colors) = self.scheme(name) {
            return colors;
        }
        debug!(scheme = name, "Unknown color scheme, using default");
        self.scheme(DEFAULT_SCHEME).unwrap_or(&[])
    }

    /// Look a unit up in `extra` first, then in the registry.
    pub fn unit_with<'a>(
        &'a self,
        name: &str,
        extra: &'a HashMap<String, UnitDef>,
    ) -> Option<&'a UnitDef> {
        extra.get(name).or_else(|| self.units.get(name))
    }

    /// Converter between two named units; `None` if either is unknown or
    /// they measure different dimensions.
    pub fn converter(&self, from: &str, to: &str) -> Option<UnitConverter> {
        self.converter_with(from, to, &HashMap::new())
    }

    /// Like [`Registry::converter`], consulting `extra` units first.
    pub fn converter_with(
        &self,
        from: &str,
        to: &str,
        extra: &HashMap<String, UnitDef>,
    ) -> Option<UnitConverter> {
        if from == to {
            return Some(UnitConverter::identity());
        }
        let from_def = self.unit_with(from, extra)?;
        let to_def = self.unit_with(to, extra)?;
        UnitConverter::between(from_def, to_def)
    }

    /// Whether `unit` measures an angle (circular interpolation needed).
    pub fn is_angular(&self, unit: &str) -> bool {
        self.units.get(unit).map(UnitDef::is_angular).unwrap_or(false)
    }

    /// Degrees in one `unit`, or `None` when it is not an angle.
    pub fn degrees_per_unit(&self, unit: &str) -> Option<f64> {
        self.units
            .get(unit)
            .filter(|def| def.is_angular() && def.scale != 0.0)
            .map(|def| def.scale)
    }

    /// Resolve a named style. Unknown names resolve to `base`.
    pub fn resolve_named(&self, name: &str) -> StrictStyle {
        match self.styles.get(name) {
            Some(style) => {
                let mut style = style.clone();
                if style.name.is_none() {
                    style.name = Some(name.to_string());
                }
                self.resolve_style(&style)
            }
            None => {
                warn!(style = name, "Unknown style, falling back to base");
                self.resolve_style(&ColorStyle::default())
            }
        }
    }

    /// Walk the parent chain of `style` and merge
    /// `defaults <- ancestors <- style`.
    ///
    /// A parent that is not registered falls back to `base`; a chain that
    /// loops back on itself stops at the first repeated name.
    pub fn resolve_style(&self, style: &ColorStyle) -> StrictStyle {
        let mut chain: Vec<&ColorStyle> = vec![style];
        let mut visited: HashSet<String> = HashSet::new();
        let mut next = style.parent.clone();

        while let Some(parent_name) = next.take() {
            if !visited.insert(parent_name.clone()) {
                warn!(style = %parent_name, "Style parent chain loops, stopping");
                break;
            }
            let parent = match self.styles.get(&parent_name) {
                Some(parent) => parent,
                None => {
                    warn!(style = %parent_name, "Parent style not found, using base");
                    if !visited.insert(BASE_STYLE.to_string()) {
                        break;
                    }
                    match self.styles.get(BASE_STYLE) {
                        Some(base) => base,
                        None => break,
                    }
                }
            };
            chain.push(parent);
            next = parent.parent.clone();
        }

        let merged = chain
            .iter()
            .rev()
            .fold(StrictStyle::default().to_partial(), |acc, s| acc.merge(s));
        StrictStyle::from_partial(&merged)
    }
}

fn builtin_schemes() -> HashMap<String, Vec<String>> {
    let table: &[(&str, &[&str])] = &[
        (
            DEFAULT_SCHEME,
            &[
                "#00007f", "#0000ff", "#007fff", "#00ffff", "#7fff7f", "#ffff00", "#ff7f00",
                "#ff0000", "#7f0000",
            ],
        ),
        (
            "rainbow",
            &[
                "#9400d3", "#4b0082", "#0000ff", "#00ff00", "#ffff00", "#ff7f00", "#ff0000",
            ],
        ),
        ("gray", &["#000000", "#ffffff"]),
        ("bluered", &["#0000ff", "#ffffff", "#ff0000"]),
        (
            "thermal",
            &[
                "#19004c", "#0000ff", "#00ffff", "#00ff00", "#ffff00", "#ffa500", "#ff0000",
                "#8b0000",
            ],
        ),
        (
            "ocean",
            &["#081d58", "#225ea8", "#1d91c0", "#41b6c4", "#7fcdbb", "#c7e9b4", "#ffffd9"],
        ),
    ];

    table
        .iter()
        .map(|(name, colors)| {
            (
                name.to_string(),
                colors.iter().map(|c| c.to_string()).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::FillMode;

    #[test]
    fn test_resolve_chain_defaults_parent_explicit() {
        let mut registry = Registry::new();
        registry.add_style(
            "temperature",
            ColorStyle {
                units: Some("C".to_string()),
                blur_radius: Some(2),
                fill: Some(FillMode::Solid),
                ..Default::default()
            },
        );
        let style = ColorStyle {
            parent: Some("temperature".to_string()),
            units: Some("F".to_string()),
            ..Default::default()
        };

        let strict = registry.resolve_style(&style);
        assert_eq!(strict.units, "F");
        assert_eq!(strict.blur_radius, 2);
        assert_eq!(strict.fill, FillMode::Solid);
        assert_eq!(strict.stream_line_steps, 300);
    }

    #[test]
    fn test_missing_parent_falls_back_to_base() {
        let registry = Registry::new();
        let style = ColorStyle {
            parent: Some("does-not-exist".to_string()),
            blur_radius: Some(1),
            ..Default::default()
        };
        let strict = registry.resolve_style(&style);
        assert_eq!(strict.blur_radius, 1);
        assert_eq!(strict.color_scheme, DEFAULT_SCHEME);
    }

    #[test]
    fn test_cyclic_parents_terminate() {
        let mut registry = Registry::new();
        registry.add_style(
            "a",
            ColorStyle {
                parent: Some("b".to_string()),
                blur_radius: Some(3),
                ..Default::default()
            },
        );
        registry.add_style(
            "b",
            ColorStyle {
                parent: Some("a".to_string()),
                units: Some("knots".to_string()),
                ..Default::default()
            },
        );
        let strict = registry.resolve_named("a");
        assert_eq!(strict.name, "a");
        assert_eq!(strict.blur_radius, 3);
        assert_eq!(strict.units, "knots");
    }

    #[test]
    fn test_converter_lookup() {
        let registry = Registry::new();
        let conv = registry.converter("m/s", "knots").unwrap();
        assert!((conv.apply(10.0) - 19.44).abs() < 0.01);
        assert!(registry.converter("m/s", "hPa").is_none());
        assert!(registry.converter("bogus", "m/s").is_none());
        assert!(registry.converter("bogus", "bogus").unwrap().is_identity());
    }

    #[test]
    fn test_degrees_per_unit() {
        let registry = Registry::new();
        assert_eq!(registry.degrees_per_unit("degree"), Some(1.0));
        let rad = registry.degrees_per_unit("rad").unwrap();
        assert!((rad - 57.29578).abs() < 1e-4);
        assert_eq!(registry.degrees_per_unit("m/s"), None);
        assert_eq!(registry.degrees_per_unit("furlong"), None);
    }

    #[test]
    fn test_registry_from_yaml() {
        let yaml = r##"
styles:
  swell:
    parent: base
    units: ft
    color_scheme: ocean
color_schemes:
  mono: ["#000000", "#00ff00"]
units:
  fathom:
    base: m
    scale: 1.8288
"##;
        let registry = Registry::from_yaml(yaml).unwrap();
        assert_eq!(registry.resolve_named("swell").units, "ft");
        assert_eq!(registry.scheme("mono").unwrap().len(), 2);
        let conv = registry.converter("fathom", "m").unwrap();
        assert!((conv.apply(1.0) - 1.8288).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_scheme_uses_default() {
        let registry = Registry::new();
        assert_eq!(
            registry.scheme_or_default("nope"),
            registry.scheme(DEFAULT_SCHEME).unwrap()
        );
    }
}
