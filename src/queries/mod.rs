pub mod evaluations;
pub mod news;
pub mod questions;
pub mod records;
pub mod sessions;
pub mod users;

use libsql::{Rows, de};
use serde::de::DeserializeOwned;

pub(crate) async fn collect_rows<T: DeserializeOwned>(mut rows: Rows) -> anyhow::Result<Vec<T>> {
    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        out.push(de::from_row(&row)?);
    }

    Ok(out)
}

pub(crate) async fn first_row<T: DeserializeOwned>(mut rows: Rows) -> anyhow::Result<Option<T>> {
    match rows.next().await? {
        Some(row) => Ok(Some(de::from_row(&row)?)),
        None => Ok(None),
    }
}
