//! The `fields` command: what a layer offers for binding.

use kmlexport::layer::LayerRef;
use kmlexport::source::{RasterDataset, VectorDataset};
use kmlexport::{FileLayerProvider, LayerProvider};

use crate::error::CliError;

/// Print the schema of a vector layer, or size and reference of a raster.
pub fn run(layer: &str) -> Result<(), CliError> {
    let layer = LayerRef::from_path(layer);
    let provider = FileLayerProvider;
    let lines = match &layer {
        LayerRef::Vector(vector) => describe_vector(layer.name(), &provider.open_vector(vector)?),
        LayerRef::Raster(raster) => describe_raster(layer.name(), &provider.open_raster(raster)?),
    };
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

fn describe_vector(name: &str, dataset: &VectorDataset) -> Vec<String> {
    let mut lines = vec![
        format!("Vector layer: {}", name),
        format!("  Features:  {}", dataset.features.len()),
        format!(
            "  Reference: {}",
            dataset.spatial_ref.as_deref().unwrap_or("(none)")
        ),
        format!("  Fields ({}):", dataset.fields.len()),
    ];
    lines.extend(dataset.fields.iter().map(|f| format!("    {}", f)));
    lines
}

fn describe_raster(name: &str, dataset: &RasterDataset) -> Vec<String> {
    let extent = dataset.extent();
    vec![
        format!("Raster layer: {}", name),
        format!("  Size:      {}x{}", dataset.width, dataset.height),
        format!(
            "  Reference: {}",
            dataset.spatial_ref.as_deref().unwrap_or("(none)")
        ),
        format!(
            "  Extent:    {}, {} - {}, {}",
            extent.min_x, extent.min_y, extent.max_x, extent.max_y
        ),
    ]
}
