use crate::error::{LoadError, OrchestrationError};
use crate::models::Order;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Loads the order collection from a JSON file
///
/// # Arguments
/// * `path` - Path to a JSON array of orders
///
/// # Returns
/// Orders in document order
pub fn load_orders(path: &Path) -> Result<Vec<Order>, OrchestrationError> {
    read_orders(path).map_err(|source| OrchestrationError::LoadFailed {
        path: path.to_path_buf(),
        source,
    })
}

fn read_orders(path: &Path) -> Result<Vec<Order>, LoadError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}
