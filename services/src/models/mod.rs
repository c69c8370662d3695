mod aoi;
mod executor;

pub use self::aoi::write_aoi;
pub use self::executor::{CommandModelExecutor, ModelExecutor};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use strum::{Display, EnumString, IntoStaticStr};

/// File name of the buffered study area in a model workspace.
pub const AOI_FILE_NAME: &str = "aoi.geojson";

/// Cooling distance of the urban cooling model in meters.
pub const URBAN_COOLING_DISTANCE: f64 = 450.0;

/// Search radius of the urban nature access model in meters.
pub const URBAN_NATURE_ACCESS_SEARCH_RADIUS: f64 = 800.0;

/// The ecosystem service models that can be run for a scenario.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InvestModel {
    Carbon,
    UrbanCoolingModel,
    UrbanNatureAccess,
}

/// The paths a model run reads from and writes to.
#[derive(Debug, Clone)]
pub struct ModelInputs<'a> {
    /// the land-cover raster of the scenario
    pub lulc_path: &'a str,
    pub workspace: &'a Path,
    /// biophysical tables and auxiliary rasters
    pub data_directory: &'a Path,
}

impl<'a> ModelInputs<'a> {
    pub fn aoi_path(&self) -> PathBuf {
        self.workspace.join(AOI_FILE_NAME)
    }

    fn data_file(&self, relative: &str) -> String {
        self.data_directory.join(relative).to_string_lossy().into_owned()
    }

    fn biophysical_table(&self, file_name: &str) -> String {
        self.data_file(&format!("biophysical_tables/{file_name}"))
    }
}

impl InvestModel {
    /// The distance the study area is buffered by to get the area of interest of the model.
    /// Models without an area of interest return `None`.
    pub fn serviceshed_distance(self) -> Option<f64> {
        match self {
            InvestModel::Carbon => None,
            InvestModel::UrbanCoolingModel => Some(URBAN_COOLING_DISTANCE),
            InvestModel::UrbanNatureAccess => Some(URBAN_NATURE_ACCESS_SEARCH_RADIUS),
        }
    }

    /// The python module that implements the model.
    pub fn module_name(self) -> String {
        format!("natcap.invest.{self}")
    }

    /// Builds the arguments of the model. Models with a serviceshed read the area of interest
    /// from [`ModelInputs::aoi_path`].
    pub fn build_args(self, inputs: &ModelInputs) -> Map<String, Value> {
        let workspace = inputs.workspace.to_string_lossy();
        let aoi_path = inputs.aoi_path().to_string_lossy().into_owned();

        let args: Vec<(&str, Value)> = match self {
            InvestModel::Carbon => vec![
                ("workspace_dir", json!(workspace)),
                ("calc_sequestration", json!(true)),
                ("carbon_pools_path", json!(inputs.biophysical_table("carbon__nlcd_nlud_tree.csv"))),
                ("do_redd", json!(false)),
                ("do_valuation", json!(false)),
                ("lulc_cur_path", json!(inputs.lulc_path)),
            ],
            InvestModel::UrbanCoolingModel => vec![
                ("workspace_dir", json!(workspace)),
                ("aoi_vector_path", json!(aoi_path)),
                ("lulc_raster_path", json!(inputs.lulc_path)),
                ("biophysical_table_path", json!(inputs.biophysical_table("ucm__nlcd_nlud_tree.csv"))),
                ("do_energy_valuation", json!(false)),
                ("do_productivity_valuation", json!(false)),
                ("ref_eto_raster_path", json!(inputs.data_file("et0_annual_cgiar_3857.tif"))),
                ("cc_method", json!("factors")),
                ("cc_weight_albedo", json!("0.2")),
                ("cc_weight_eti", json!("0.2")),
                ("cc_weight_shade", json!("0.6")),
                ("t_air_average_radius", json!("600")),
                ("green_area_cooling_distance", json!(URBAN_COOLING_DISTANCE.to_string())),
                // TODO: derive the reference temperature and the UHI magnitude from the location
                ("t_ref", json!("35")),
                ("uhi_max", json!("11")),
            ],
            InvestModel::UrbanNatureAccess => vec![
                ("workspace_dir", json!(workspace)),
                ("admin_boundaries_vector_path", json!(aoi_path)),
                ("aggregate_by_pop_group", json!(false)),
                ("decay_function", json!("dichotomy")),
                ("lulc_attribute_table", json!(inputs.biophysical_table("una__nlcd_nlud_tree.csv"))),
                ("lulc_raster_path", json!(inputs.lulc_path)),
                ("population_raster_path", json!(inputs.data_file("population_per_pixel_2020_3857.tif"))),
                ("search_radius", json!(URBAN_NATURE_ACCESS_SEARCH_RADIUS as u32)),
                ("search_radius_mode", json!("uniform radius")),
                ("urban_nature_demand", json!("16.7")),
            ],
        };

        args
            .into_iter()
            .map(|(key, value)| (key.to_owned(), value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn inputs() -> ModelInputs<'static> {
        ModelInputs {
            lulc_path: "/outputs/scenarios/3/3_lulc_fill.tif",
            workspace: Path::new("/outputs/model_outputs/carbon-3"),
            data_directory: Path::new("/data/invest"),
        }
    }

    #[test]
    fn model_names() {
        assert_eq!(
            serde_json::from_str::<InvestModel>("\"urban_nature_access\"").unwrap(),
            InvestModel::UrbanNatureAccess
        );
        assert_eq!(InvestModel::UrbanCoolingModel.to_string(), "urban_cooling_model");
        assert_eq!(InvestModel::Carbon.module_name(), "natcap.invest.carbon");
    }

    #[test]
    fn carbon_args() {
        let args = InvestModel::Carbon.build_args(&inputs());

        assert_eq!(
            Value::Object(args),
            json!({
                "workspace_dir": "/outputs/model_outputs/carbon-3",
                "calc_sequestration": true,
                "carbon_pools_path": "/data/invest/biophysical_tables/carbon__nlcd_nlud_tree.csv",
                "do_redd": false,
                "do_valuation": false,
                "lulc_cur_path": "/outputs/scenarios/3/3_lulc_fill.tif",
            })
        );
        assert_eq!(InvestModel::Carbon.serviceshed_distance(), None);
    }

    #[test]
    fn urban_cooling_args() {
        let args = InvestModel::UrbanCoolingModel.build_args(&inputs());

        assert_eq!(
            args["aoi_vector_path"],
            json!("/outputs/model_outputs/carbon-3/aoi.geojson")
        );
        assert_eq!(args["green_area_cooling_distance"], json!("450"));
        assert_eq!(args["cc_weight_shade"], json!("0.6"));
        assert_eq!(
            args["ref_eto_raster_path"],
            json!("/data/invest/et0_annual_cgiar_3857.tif")
        );
        assert_eq!(args.len(), 15);
        assert_eq!(
            InvestModel::UrbanCoolingModel.serviceshed_distance(),
            Some(450.)
        );
    }

    #[test]
    fn urban_nature_access_args() {
        let args = InvestModel::UrbanNatureAccess.build_args(&inputs());

        assert_eq!(args["search_radius"], json!(800));
        assert_eq!(args["search_radius_mode"], json!("uniform radius"));
        assert_eq!(
            args["admin_boundaries_vector_path"],
            json!("/outputs/model_outputs/carbon-3/aoi.geojson")
        );
        assert_eq!(args.len(), 10);
    }
}
