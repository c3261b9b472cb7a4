//! JSON composite recipes

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use cloudless_algorithms::imagery::CompositeParams;
use cloudless_core::io::{DEFAULT_EXPORT_SCALE, DEFAULT_MAX_PIXELS};
use geo_types::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

/// Northern and western Alaska, lon/lat degrees
const ALASKA_AOI: [(f64, f64); 44] = [
    (-152.0102247571382, 70.9252290904927),
    (-154.4452730349626, 71.1543982293018),
    (-156.56617293317774, 71.50869963922115),
    (-162.5265409716858, 70.28273292609235),
    (-163.23075239147093, 69.89000776807097),
    (-163.58292620615333, 69.31639221665581),
    (-164.44410004139095, 69.02572331396982),
    (-166.42545877972526, 68.94545437962545),
    (-167.22535685338616, 68.21295084098831),
    (-165.43508973443917, 67.8544054239737),
    (-164.1807462457679, 67.35800364037813),
    (-164.0840990860454, 66.96186838828613),
    (-162.93032898267933, 66.81005062732052),
    (-161.69041836906888, 65.72034838653647),
    (-161.13091239684894, 65.68933638425219),
    (-160.81908235553885, 65.87350842233059),
    (-159.76881701669282, 65.88040430995149),
    (-159.2996153731802, 65.60144269239325),
    (-156.83325158776913, 65.53955564938177),
    (-157.73773899207274, 64.7740231776961),
    (-157.4941279405618, 64.51965594214724),
    (-156.90002868737903, 64.36250171897812),
    (-156.01842037346285, 64.45565788023332),
    (-155.2148138001279, 64.65602424650854),
    (-154.55437892677577, 64.60334011615699),
    (-154.02801664768302, 64.75110474060759),
    (-153.8952458627111, 64.87529210945537),
    (-152.83454410582127, 64.81450638686385),
    (-151.85713995816437, 64.75894412324766),
    (-150.8448051660892, 64.57216198916382),
    (-150.23555665036614, 64.400247041077),
    (-149.90094523207958, 64.17687502849152),
    (-148.7996579833648, 64.51680319858733),
    (-146.62775046571747, 65.37122561493678),
    (-144.44771671648448, 65.12869245276251),
    (-143.21492525374188, 64.73942263309328),
    (-141.31126213285955, 64.43296979942667),
    (-140.6801583753294, 64.41347917470533),
    (-140.6067436416567, 69.78630891489286),
    (-143.1132841021565, 70.30054561014617),
    (-144.83517301345924, 70.14831789601057),
    (-149.36291532748905, 70.64878808985637),
    (-151.2289852785363, 70.68476838804165),
    (-152.0102247571382, 70.9252290904927),
];

/// Area of interest of the July greenest-pixel product
pub fn default_area_of_interest() -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = ALASKA_AOI.iter().map(|&(x, y)| Coord { x, y }).collect();
    Polygon::new(LineString::from(ring), vec![])
}

/// One input image: a GeoTIFF per band plus its cloud score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Scene identifier, used in logs
    pub id: String,
    /// Band name to single-band GeoTIFF path
    pub bands: BTreeMap<String, PathBuf>,
    /// Single-band GeoTIFF with per-pixel cloud scores in [0, 100]
    pub cloud_score: PathBuf,
}

/// Where and how output bands are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Prefix of every output description, e.g. `07July`
    pub prefix: String,
    pub output_dir: PathBuf,
    /// Output resolution in map units per pixel
    pub scale: f64,
    /// Pixel budget per exported band
    pub max_pixels: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            prefix: "07July".into(),
            output_dir: PathBuf::from("output"),
            scale: DEFAULT_EXPORT_SCALE,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

/// A complete composite run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeConfig {
    /// Input images in time order
    pub scenes: Vec<SceneConfig>,
    #[serde(default)]
    pub params: CompositeParams,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default = "default_area_of_interest")]
    pub area_of_interest: Polygon<f64>,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            scenes: Vec::new(),
            params: CompositeParams::default(),
            export: ExportConfig::default(),
            area_of_interest: default_area_of_interest(),
        }
    }
}

impl CompositeConfig {
    /// Default recipe with one placeholder Landsat 8 scene
    pub fn template() -> Self {
        let id = "LC08_076013_20160711";
        let dir = PathBuf::from("scenes").join(id);
        let bands = (1..=7)
            .map(|n| {
                let name = format!("B{n}");
                let path = dir.join(format!("{name}.tif"));
                (name, path)
            })
            .collect();
        Self {
            scenes: vec![SceneConfig {
                id: id.into(),
                bands,
                cloud_score: dir.join("cloud.tif"),
            }],
            ..Self::default()
        }
    }

    /// Read a recipe; relative paths are resolved against its directory
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open recipe {}", path.display()))?;
        let mut config: CompositeConfig = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse recipe {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for scene in &mut self.scenes {
            scene.bands.values_mut().for_each(resolve);
            resolve(&mut scene.cloud_score);
        }
        resolve(&mut self.export.output_dir);
    }

    /// Structural checks that do not need any raster
    pub fn validate(&self) -> Result<()> {
        if self.scenes.is_empty() {
            bail!("Recipe lists no scenes");
        }
        for scene in &self.scenes {
            if scene.bands.is_empty() {
                bail!("Scene '{}' lists no bands", scene.id);
            }
        }
        if self.export.prefix.trim().is_empty() {
            bail!("Export prefix must not be empty");
        }
        Ok(())
    }
}
