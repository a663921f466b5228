//! Layer sessions.
//!
//! A session renders one variable of one dataset instance with one style at
//! one time step. It owns the decoded and processed tile caches, the color
//! table and the mask state, and runs every tile through
//! fetch, decode, blur, resample, mask and vector synthesis.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use grid_processor::{
    apply_mask, decode, resample, resample_angle, trace_streamlines, GridProcessorError,
    IntegralGrid, MaskImage, QTree, RasterGrid, StreamlineParams, TileClass, VectorSample,
};
use lru::LruCache;
use renderer::{Clut, Legend};
use storage::{AbortableLoader, LoadError, TileFetcher};
use tokio::sync::{Mutex, OnceCell, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use wx_common::style::MaskMode;
use wx_common::{
    split_coords, ColorStyle, DatasetMeta, Registry, StrictStyle, SubCoord, TileCoord, WxError,
};

use crate::bundle::{EmptyReason, TileBundle, TileOutcome};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::uri::{expand_template, tile_uri, LayerId};

/// Number of mask tiles kept per session.
const MASK_CACHE_CAPACITY: usize = 64;

struct LayerState {
    style: Arc<StrictStyle>,
    time: String,
    clut: Arc<Clut>,
    /// Bumped on every style or time change; part of processed-tile keys.
    generation: u64,
}

/// One variable of one dataset, rendered with one style at one time.
pub struct LayerSession {
    config: PipelineConfig,
    registry: Arc<Registry>,
    meta: Arc<DatasetMeta>,
    layer: LayerId,
    fetcher: Arc<dyn TileFetcher>,
    state: RwLock<LayerState>,
    grids: AbortableLoader<Arc<IntegralGrid>>,
    masks: AbortableLoader<Arc<MaskImage>>,
    bundles: Mutex<LruCache<(u64, TileCoord), Arc<TileBundle>>>,
    qtree: OnceCell<Option<Arc<QTree>>>,
    masking_disabled: AtomicBool,
}

impl LayerSession {
    /// Open a session.
    ///
    /// Without an explicit `time` the last time step of the dataset is used.
    pub fn new(
        config: PipelineConfig,
        registry: Arc<Registry>,
        meta: Arc<DatasetMeta>,
        fetcher: Arc<dyn TileFetcher>,
        layer: LayerId,
        style: &ColorStyle,
        time: Option<String>,
    ) -> Result<Self> {
        config.validate()?;
        meta.variable(&layer.variable)?;

        let time = match time {
            Some(time) => check_time(&meta, time)?,
            None => meta.times.last().cloned().ok_or_else(|| {
                WxError::InvalidMetadata("dataset lists no time steps".to_string())
            })?,
        };

        let style = Arc::new(registry.resolve_style(style));
        let clut = Arc::new(build_clut(&registry, &meta, &layer.variable, &style)?);

        info!(
            dataset = %layer.dataset,
            variable = %layer.variable,
            style = %style.name,
            time = %time,
            "Opened layer session"
        );

        Ok(Self {
            grids: AbortableLoader::new(config.cache_capacity),
            masks: AbortableLoader::new(MASK_CACHE_CAPACITY),
            bundles: Mutex::new(LruCache::new(
                NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            config,
            registry,
            meta,
            layer,
            fetcher,
            state: RwLock::new(LayerState {
                style,
                time,
                clut,
                generation: 0,
            }),
            qtree: OnceCell::new(),
            masking_disabled: AtomicBool::new(false),
        })
    }

    /// Produce one tile.
    #[instrument(skip(self), fields(z = coord.z, x = coord.x, y = coord.y))]
    pub async fn load_tile(&self, coord: TileCoord) -> Result<TileOutcome> {
        if !self.meta.intersects_tile(&coord) {
            debug!("Tile outside dataset boundaries");
            return Ok(TileOutcome::Empty(EmptyReason::OutOfBoundaries));
        }

        let (style, time, generation) = {
            let state = self.state.read().await;
            (Arc::clone(&state.style), state.time.clone(), state.generation)
        };

        let class = self.classify(coord, style.mask).await;
        if class.is_some_and(|c| c.is_cut_by(style.mask)) {
            debug!(?class, "Tile cut by mask");
            return Ok(TileOutcome::Empty(EmptyReason::MaskCut));
        }

        let key = (generation, coord);
        if let Some(bundle) = self.bundles.lock().await.get(&key) {
            debug!("Processed tile cache hit");
            return Ok(TileOutcome::Tile(Arc::clone(bundle)));
        }

        let bundle = Arc::new(self.build_bundle(coord, class, &style, &time).await?);
        self.bundles.lock().await.put(key, Arc::clone(&bundle));
        Ok(TileOutcome::Tile(bundle))
    }

    /// Fetch, decode and process one tile that survived the mask check.
    async fn build_bundle(
        &self,
        coord: TileCoord,
        class: Option<TileClass>,
        style: &StrictStyle,
        time: &str,
    ) -> Result<TileBundle> {
        let split = split_coords(coord, self.meta.max_zoom);
        let components = self.meta.components(&self.layer.variable)?;
        let loaded = try_join_all(
            components
                .iter()
                .map(|component| self.load_grid(component, time, split.parent)),
        )
        .await?;

        let mut grids = Vec::with_capacity(loaded.len());
        for (component, integral) in components.iter().zip(loaded) {
            let mut integral = IntegralGrid::clone(&integral);
            integral.blur(style.blur_radius);
            let raster = integral.into_raster();
            let units = &self.meta.variable(component)?.units;
            grids.push(match self.registry.degrees_per_unit(units) {
                Some(degrees) => resample_angle(raster, split.sub, degrees),
                None => resample(raster, split.sub),
            });
        }

        if class == Some(TileClass::Mixed) {
            if let Some((mask, sub)) = self.load_mask(coord).await? {
                for grid in &mut grids {
                    apply_mask(grid, &mask, sub, style.mask);
                }
            }
        }

        let bundle = match <[RasterGrid; 2]>::try_from(grids) {
            Ok([u, v]) => {
                let field = VectorSample::new(u, v)?;
                let streamlines = if style.wants_streamlines() {
                    trace_streamlines(&field, &self.stream_params(style))
                } else {
                    Vec::new()
                };
                TileBundle {
                    coord,
                    grids: vec![field.magnitude, field.u, field.v],
                    streamlines,
                }
            }
            Err(grids) => TileBundle {
                coord,
                grids,
                streamlines: Vec::new(),
            },
        };

        debug!(
            grids = bundle.grids.len(),
            streamlines = bundle.streamlines.len(),
            "Tile ready"
        );
        Ok(bundle)
    }

    /// Produce several tiles concurrently; each resolves on its own.
    pub async fn load_tiles(&self, coords: &[TileCoord]) -> Vec<(TileCoord, Result<TileOutcome>)> {
        join_all(
            coords
                .iter()
                .map(|&coord| async move { (coord, self.load_tile(coord).await) }),
        )
        .await
    }

    /// Switch to another style, rebuilding the color table.
    pub async fn set_style(&self, style: &ColorStyle) -> Result<()> {
        self.apply_style(self.registry.resolve_style(style)).await
    }

    /// Switch to a registered style by name. Unknown names use the base style.
    pub async fn set_style_named(&self, name: &str) -> Result<()> {
        self.apply_style(self.registry.resolve_named(name)).await
    }

    async fn apply_style(&self, style: StrictStyle) -> Result<()> {
        let style = Arc::new(style);
        let clut = Arc::new(build_clut(
            &self.registry,
            &self.meta,
            &self.layer.variable,
            &style,
        )?);
        {
            let mut state = self.state.write().await;
            info!(from = %state.style.name, to = %style.name, "Style changed");
            state.style = style;
            state.clut = clut;
            state.generation += 1;
        }
        self.bundles.lock().await.clear();
        self.abort().await;
        Ok(())
    }

    /// Switch to another time step; decoded tiles of the old time are dropped.
    pub async fn set_time(&self, time: impl Into<String>) -> Result<()> {
        let time = check_time(&self.meta, time.into())?;
        {
            let mut state = self.state.write().await;
            if state.time == time {
                return Ok(());
            }
            info!(from = %state.time, to = %time, "Time changed");
            state.time = time;
            state.clut = Arc::new(build_clut(
                &self.registry,
                &self.meta,
                &self.layer.variable,
                &state.style,
            )?);
            state.generation += 1;
        }
        self.bundles.lock().await.clear();
        self.abort().await;
        self.grids.clear().await;
        Ok(())
    }

    /// Cancel every in-flight tile and mask load.
    pub async fn abort(&self) {
        self.grids.abort().await;
        self.masks.abort().await;
    }

    pub async fn clut(&self) -> Arc<Clut> {
        Arc::clone(&self.state.read().await.clut)
    }

    pub async fn style(&self) -> Arc<StrictStyle> {
        Arc::clone(&self.state.read().await.style)
    }

    pub async fn time(&self) -> String {
        self.state.read().await.time.clone()
    }

    /// Legend strip of `size` colors for the current color table.
    pub async fn legend(&self, size: usize) -> Legend {
        self.clut().await.legend(size)
    }

    pub fn layer(&self) -> &LayerId {
        &self.layer
    }

    /// False once a mask or quad-tree failed to load.
    pub fn masking_enabled(&self) -> bool {
        !self.masking_disabled.load(Ordering::Relaxed)
    }

    async fn load_grid(
        &self,
        variable: &str,
        time: &str,
        parent: TileCoord,
    ) -> std::result::Result<Arc<IntegralGrid>, LoadError> {
        let uri = tile_uri(&self.config.data_base_url, &self.layer, variable, time, parent);
        let key = uri.clone();
        let fetcher = Arc::clone(&self.fetcher);
        self.grids
            .load(&key, move |token| async move {
                let bytes = fetcher.fetch(&uri, &token).await?;
                decode(&bytes)
                    .map(Arc::new)
                    .map_err(|e| LoadError::Decode(e.to_string()))
            })
            .await
    }

    /// Classify a tile for masking. `None` means "do not mask".
    async fn classify(&self, coord: TileCoord, mode: MaskMode) -> Option<TileClass> {
        if mode == MaskMode::None || !self.masking_enabled() {
            return None;
        }
        let Some(url) = &self.config.qtree_url else {
            // Without an index every tile needs its mask image.
            return Some(TileClass::Mixed);
        };
        let tree = self.qtree.get_or_init(|| self.load_qtree(url)).await;
        tree.as_ref().map(|tree| tree.check(coord))
    }

    async fn load_qtree(&self, url: &str) -> Option<Arc<QTree>> {
        // Loaded once per session, so it never runs under an abortable token.
        let parsed = match self.fetcher.fetch(url, &CancellationToken::new()).await {
            Ok(bytes) => std::str::from_utf8(&bytes)
                .map_err(|e| GridProcessorError::mask_load_failure(e.to_string()))
                .and_then(QTree::parse),
            Err(e) => Err(GridProcessorError::mask_load_failure(e.to_string())),
        };

        match parsed {
            Ok(tree) => {
                info!(
                    url = %url,
                    depth = tree.depth(),
                    nodes = tree.node_count(),
                    "Loaded mask quad-tree"
                );
                Some(Arc::new(tree))
            }
            Err(e) => {
                self.disable_masking(&e);
                None
            }
        }
    }

    async fn load_mask(
        &self,
        coord: TileCoord,
    ) -> std::result::Result<Option<(Arc<MaskImage>, Option<SubCoord>)>, LoadError> {
        let Some(template) = &self.config.mask_url else {
            debug!("No mask URL configured, tile left unmasked");
            return Ok(None);
        };

        let split = split_coords(coord, self.config.mask_depth);
        let uri = expand_template(template, split.parent);
        let key = uri.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let channel = self.config.mask_channel;

        let result = self
            .masks
            .load(&key, move |token| async move {
                let bytes = fetcher.fetch(&uri, &token).await?;
                MaskImage::decode(&bytes, channel)
                    .map(Arc::new)
                    .map_err(|e| LoadError::Decode(e.to_string()))
            })
            .await;

        match result {
            Ok(mask) => Ok(Some((mask, split.sub))),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                self.disable_masking(&GridProcessorError::mask_load_failure(e.to_string()));
                Ok(None)
            }
        }
    }

    fn disable_masking(&self, error: &GridProcessorError) {
        if !self.masking_disabled.swap(true, Ordering::Relaxed) {
            warn!(error = %error, "Mask unavailable, masking disabled for this session");
        }
    }

    fn stream_params(&self, style: &StrictStyle) -> StreamlineParams {
        StreamlineParams {
            grid_step: self
                .config
                .stream_grid_step
                .unwrap_or(style.stream_line_grid_step),
            steps: style.stream_line_steps,
            speed_factor: style.stream_line_speed_factor,
            add_degrees: style.add_degrees,
        }
    }
}

fn check_time(meta: &DatasetMeta, time: String) -> Result<String> {
    if meta.times.is_empty() || meta.times.contains(&time) {
        Ok(time)
    } else {
        Err(WxError::InvalidMetadata(format!("unknown time step: {}", time)).into())
    }
}

fn build_clut(
    registry: &Registry,
    meta: &DatasetMeta,
    variable: &str,
    style: &StrictStyle,
) -> Result<Clut> {
    let (units, min, max) = meta.data_range(variable)?;
    Ok(Clut::build(
        style,
        registry,
        &units,
        (min, max),
        meta.is_vector(variable),
    ))
}
