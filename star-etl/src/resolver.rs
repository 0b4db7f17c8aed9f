use std::collections::HashMap;
use tracing::info;

use crate::contract::TableContract;
use crate::error::{ErrorKind, EtlResult};
use crate::store::ReportingStore;
use crate::types::{Cell, KeyValue, RowSet, SurrogateKey};
use crate::{bail, etl_error};

/// Natural key to surrogate key mapping of one dimension.
///
/// Keeps the pairs in the order they were read and indexes them by natural key. Natural keys
/// are unique and never null.
#[derive(Debug, Clone, Default)]
pub struct DimensionKeyMap {
    pairs: Vec<(KeyValue, SurrogateKey)>,
    index: HashMap<KeyValue, SurrogateKey>,
}

impl DimensionKeyMap {
    /// Builds the map from `(natural, surrogate)` pairs.
    ///
    /// Fails with [`ErrorKind::InvalidData`] when a natural key appears twice.
    pub fn from_pairs<I>(pairs: I) -> EtlResult<Self>
    where
        I: IntoIterator<Item = (KeyValue, SurrogateKey)>,
    {
        let mut map = DimensionKeyMap::default();
        for (natural, surrogate) in pairs {
            if map.index.contains_key(&natural) {
                bail!(
                    ErrorKind::InvalidData,
                    "Duplicate natural key in dimension",
                    format!("natural key {natural} appears more than once")
                );
            }
            map.index.insert(natural.clone(), surrogate);
            map.pairs.push((natural, surrogate));
        }

        Ok(map)
    }

    /// Builds the map from a `(surrogate, natural)` result as returned by
    /// [`ReportingStore::fetch_key_pairs`].
    pub fn from_row_set(row_set: &RowSet) -> EtlResult<Self> {
        if row_set.columns().len() != 2 {
            bail!(
                ErrorKind::InvalidData,
                "Key pairs must have exactly two columns",
                format!("got columns {:?}", row_set.columns())
            );
        }

        let pairs = row_set
            .rows()
            .iter()
            .map(|row| {
                let (surrogate, natural) = (&row.values()[0], &row.values()[1]);
                let natural = natural.to_key_value().ok_or_else(|| {
                    etl_error!(
                        ErrorKind::InvalidData,
                        "Dimension row has no usable natural key",
                        format!("natural key {natural:?} for surrogate key {surrogate:?}")
                    )
                })?;
                let surrogate = match surrogate {
                    Cell::I16(_) | Cell::I32(_) | Cell::I64(_) => surrogate.to_i64(),
                    _ => None,
                }
                .ok_or_else(|| {
                    etl_error!(
                        ErrorKind::InvalidData,
                        "Dimension row has no integer surrogate key",
                        format!("surrogate key {surrogate:?} for natural key {natural}")
                    )
                })?;

                Ok((natural, surrogate))
            })
            .collect::<EtlResult<Vec<_>>>()?;

        Self::from_pairs(pairs)
    }

    pub fn get(&self, natural: &KeyValue) -> Option<SurrogateKey> {
        self.index.get(natural).copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterates the pairs in load order.
    pub fn iter(&self) -> impl Iterator<Item = &(KeyValue, SurrogateKey)> {
        self.pairs.iter()
    }
}

/// Loads the key map of the dimension described by `contract` from the reporting store.
pub async fn resolve_dimension_keys<D>(
    store: &D,
    contract: &'static TableContract,
) -> EtlResult<DimensionKeyMap>
where
    D: ReportingStore,
{
    let row_set = store.fetch_key_pairs(contract).await?;
    let map = DimensionKeyMap::from_row_set(&row_set)?;

    info!(
        table = %contract.table_name(),
        keys = map.len(),
        "resolved dimension keys"
    );

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{DIM_PRODUCT, FACT_ORDER_METRICS};
    use crate::store::memory::MemoryReportingStore;
    use crate::test_utils::rows::product_rows;
    use crate::types::TableRow;

    fn pairs(rows: Vec<(Cell, Cell)>) -> RowSet {
        RowSet::with_rows(
            ["ProductKey", "Source_ProductID"],
            rows.into_iter()
                .map(|(surrogate, natural)| TableRow::new(vec![surrogate, natural]))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn integer_widths_resolve_to_the_same_key() {
        let map = DimensionKeyMap::from_row_set(&pairs(vec![
            (Cell::I64(1), Cell::I32(11)),
            (Cell::I32(2), Cell::I16(42)),
        ]))
        .unwrap();

        assert_eq!(map.get(&KeyValue::Int(11)), Some(1));
        assert_eq!(map.get(&KeyValue::Int(42)), Some(2));
        assert_eq!(map.get(&KeyValue::Int(7)), None);
    }

    #[test]
    fn duplicate_natural_keys_are_rejected() {
        let err = DimensionKeyMap::from_row_set(&pairs(vec![
            (Cell::I64(1), Cell::I32(11)),
            (Cell::I64(2), Cell::I32(11)),
        ]))
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn null_natural_keys_are_rejected() {
        let err = DimensionKeyMap::from_row_set(&pairs(vec![(Cell::I64(1), Cell::Null)]))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn pairs_keep_load_order() {
        let map = DimensionKeyMap::from_pairs([
            (KeyValue::Int(3), 30),
            (KeyValue::Int(1), 10),
        ])
        .unwrap();

        let naturals = map.iter().map(|(natural, _)| natural.clone()).collect::<Vec<_>>();
        assert_eq!(naturals, [KeyValue::Int(3), KeyValue::Int(1)]);
    }

    #[tokio::test]
    async fn resolves_keys_from_a_loaded_dimension() {
        let store = MemoryReportingStore::new();
        store
            .replace_table(&DIM_PRODUCT, product_rows(&[(11, "Queso Cabrales"), (42, "Tofu")]))
            .await
            .unwrap();

        let map = resolve_dimension_keys(&store, &DIM_PRODUCT).await.unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&KeyValue::Int(11)), Some(1));
        assert_eq!(map.get(&KeyValue::Int(42)), Some(2));
    }

    #[tokio::test]
    async fn tables_without_keys_cannot_be_resolved() {
        let store = MemoryReportingStore::new();

        let err = resolve_dimension_keys(&store, &FACT_ORDER_METRICS)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
}
