//! Data service URI templates.

use wx_common::TileCoord;

/// Identifies one variable of one dataset instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerId {
    pub dataset: String,
    pub instance: String,
    pub variable: String,
}

impl LayerId {
    pub fn new(
        dataset: impl Into<String>,
        instance: impl Into<String>,
        variable: impl Into<String>,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            instance: instance.into(),
            variable: variable.into(),
        }
    }
}

/// `{base}/{dataset}/{instance}/{variable}/{time}/{z}/{x}/{y}.png`
pub fn tile_uri(base: &str, layer: &LayerId, variable: &str, time: &str, tile: TileCoord) -> String {
    format!(
        "{}/{}/{}/{}/{}/{}/{}/{}.png",
        base.trim_end_matches('/'),
        layer.dataset,
        layer.instance,
        variable,
        time,
        tile.z,
        tile.x,
        tile.y
    )
}

/// Fill the `{z}`, `{x}` and `{y}` placeholders of a template.
pub fn expand_template(template: &str, tile: TileCoord) -> String {
    template
        .replace("{z}", &tile.z.to_string())
        .replace("{x}", &tile.x.to_string())
        .replace("{y}", &tile.y.to_string())
}
