//! Qdrant-backed `VectorStore` implementation.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, DeletePointsBuilder,
    Distance, FieldType, Filter, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder, point_id::PointIdOptions, value::Kind,
};

use crate::vector_store::{
    FieldValue, ScoredVectorPoint, VectorFilter, VectorPoint, VectorStore, VectorStoreError,
};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Payload fields that get a keyword index at collection creation, so
/// scoped searches (per project, per file) stay fast.
const INDEXED_FIELDS: &[&str] = &["project_id", "file_id", "file_path", "language", "kind"];

pub struct QdrantVectorStore {
    client: Qdrant,
}

impl std::fmt::Debug for QdrantVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantVectorStore").finish_non_exhaustive()
    }
}

impl QdrantVectorStore {
    /// Connect to a Qdrant instance at the given URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed.
    pub fn new(url: &str) -> Result<Self, VectorStoreError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| VectorStoreError::Connection(e.to_string()))?;
        Ok(Self { client })
    }
}

impl VectorStore for QdrantVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let exists = self
                .client
                .collection_exists(&collection)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            if exists {
                return Ok(());
            }

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&collection)
                        .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
                )
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;

            for field in INDEXED_FIELDS {
                self.client
                    .create_field_index(CreateFieldIndexCollectionBuilder::new(
                        &collection,
                        *field,
                        FieldType::Keyword,
                    ))
                    .await
                    .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            }

            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.client
                .collection_exists(&collection)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut qdrant_points = Vec::with_capacity(points.len());
            for p in points {
                let payload = json_payload(p.payload)?;
                qdrant_points.push(PointStruct::new(p.id, p.vector, payload));
            }

            self.client
                .upsert_points(UpsertPointsBuilder::new(&collection, qdrant_points))
                .await
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            Ok(())
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
        filter: Option<VectorFilter>,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let mut builder =
                SearchPointsBuilder::new(&collection, vector, limit).with_payload(true);
            if let Some(f) = filter {
                builder = builder.filter(convert_filter(&f));
            }

            let results = self
                .client
                .search_points(builder)
                .await
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;

            Ok(results
                .result
                .into_iter()
                .map(|point| ScoredVectorPoint {
                    id: point.id.and_then(point_id_string).unwrap_or_default(),
                    score: point.score,
                    payload: point
                        .payload
                        .into_iter()
                        .map(|(k, v)| (k, value_to_json(v)))
                        .collect(),
                })
                .collect())
        })
    }

    fn delete_by_filter(
        &self,
        collection: &str,
        filter: VectorFilter,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.client
                .delete_points(
                    DeletePointsBuilder::new(&collection).points(convert_filter(&filter)),
                )
                .await
                .map_err(|e| VectorStoreError::Delete(e.to_string()))?;
            Ok(())
        })
    }
}

fn json_payload(
    payload: HashMap<String, serde_json::Value>,
) -> Result<HashMap<String, qdrant_client::qdrant::Value>, VectorStoreError> {
    let object = serde_json::Value::Object(payload.into_iter().collect());
    serde_json::from_value(object).map_err(|e| VectorStoreError::Serialization(e.to_string()))
}

fn convert_filter(filter: &VectorFilter) -> Filter {
    Filter {
        must: filter.must.iter().map(convert_condition).collect(),
        must_not: filter.must_not.iter().map(convert_condition).collect(),
        ..Default::default()
    }
}

fn convert_condition(cond: &crate::vector_store::FieldCondition) -> Condition {
    match &cond.value {
        FieldValue::Integer(i) => Condition::matches(cond.field.clone(), *i),
        FieldValue::Text(s) => Condition::matches(cond.field.clone(), s.clone()),
        FieldValue::Bool(b) => Condition::matches(cond.field.clone(), *b),
    }
}

fn point_id_string(id: qdrant_client::qdrant::PointId) -> Option<String> {
    match id.point_id_options? {
        PointIdOptions::Num(n) => Some(n.to_string()),
        PointIdOptions::Uuid(u) => Some(u),
    }
}

fn value_to_json(value: qdrant_client::qdrant::Value) -> serde_json::Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => serde_json::Value::Null,
        Some(Kind::BoolValue(b)) => serde_json::Value::Bool(b),
        Some(Kind::DoubleValue(d)) => serde_json::json!(d),
        Some(Kind::IntegerValue(i)) => serde_json::json!(i),
        Some(Kind::StringValue(s)) => serde_json::Value::String(s),
        Some(Kind::ListValue(list)) => {
            serde_json::Value::Array(list.values.into_iter().map(value_to_json).collect())
        }
        Some(Kind::StructValue(s)) => serde_json::Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, value_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::FieldCondition;

    #[test]
    fn filter_conversion_preserves_condition_counts() {
        let filter = VectorFilter {
            must: vec![FieldCondition {
                field: "project_id".into(),
                value: FieldValue::Text("p1".into()),
            }],
            must_not: vec![FieldCondition {
                field: "degraded".into(),
                value: FieldValue::Bool(true),
            }],
        };
        let converted = convert_filter(&filter);
        assert_eq!(converted.must.len(), 1);
        assert_eq!(converted.must_not.len(), 1);
    }

    #[test]
    fn json_payload_round_trips_scalars() {
        let payload = HashMap::from([
            ("path".to_string(), serde_json::json!("src/lib.rs")),
            ("line".to_string(), serde_json::json!(42)),
        ]);
        let converted = json_payload(payload).unwrap();
        assert_eq!(converted.len(), 2);

        let back: HashMap<String, serde_json::Value> = converted
            .into_iter()
            .map(|(k, v)| (k, value_to_json(v)))
            .collect();
        assert_eq!(back["path"], serde_json::json!("src/lib.rs"));
        assert_eq!(back["line"], serde_json::json!(42));
    }

    #[test]
    fn point_id_string_variants() {
        let num = qdrant_client::qdrant::PointId {
            point_id_options: Some(PointIdOptions::Num(7)),
        };
        assert_eq!(point_id_string(num).as_deref(), Some("7"));

        let uuid = qdrant_client::qdrant::PointId {
            point_id_options: Some(PointIdOptions::Uuid("abc".into())),
        };
        assert_eq!(point_id_string(uuid).as_deref(), Some("abc"));
    }
}
