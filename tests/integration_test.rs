#[cfg(test)]
mod tests {
    use std::{collections::HashSet, fs::File, sync::Arc, thread};

    use knn_engine::{
        data::generator::DenseDataGenerator,
        error::{ERR_INVALID_ARGUMENT, ERR_INVALID_TOPN, ERR_NOT_SUPPORTED},
        index::linscan,
        ConflictType, Database, DatabaseConfig, DistanceMetric, HnswIndex, IndexInfo, IndexKind,
        InitParameter, KnnError, KnnRequest, KnnResult, Row, RowId, SearchPath, TableSchema,
        Value,
    };
    use proptest::prelude::*;
    use serde_json::{json, Value as JsonValue};

    const TABLE: &str = "test_knn";
    const VECTOR_COLUMNS: [&str; 5] = [
        "gender_vector",
        "color_vector",
        "category_vector",
        "tag_vector",
        "other_vector",
    ];
    const ROWS: usize = 200;

    fn schema() -> TableSchema {
        TableSchema::from_pairs(&[
            ("variant_id", "varchar"),
            ("gender_vector", "vector,4,float"),
            ("color_vector", "vector,4,float"),
            ("category_vector", "vector,4,float"),
            ("tag_vector", "vector,4,float"),
            ("other_vector", "vector,4,float"),
            ("query_is_recommend", "varchar"),
            ("query_gender", "varchar"),
            ("query_color", "varchar"),
            ("query_price", "float"),
        ])
        .unwrap()
    }

    fn rows(count: usize, seed: u64) -> Vec<Row> {
        let columns: Vec<Vec<Vec<f32>>> = (0..VECTOR_COLUMNS.len())
            .map(|i| DenseDataGenerator::new(4, count, (0.0, 1.0), seed + i as u64).generate())
            .collect();

        (0..count)
            .map(|r| {
                let mut row = Row::new()
                    .with("variant_id", format!("variant_{}", r))
                    .with("query_is_recommend", if r % 2 == 0 { "ok" } else { "no" })
                    .with("query_gender", "varchar")
                    .with("query_color", "red")
                    .with("query_price", r as f64);
                for (c, name) in VECTOR_COLUMNS.iter().enumerate() {
                    row = row.with(*name, columns[c][r].clone());
                }
                row
            })
            .collect()
    }

    fn database(capacity: u32) -> Database {
        let db = Database::with_config(DatabaseConfig {
            segment_capacity: capacity,
            ..DatabaseConfig::default()
        })
        .unwrap();
        db.drop_table(TABLE, ConflictType::Ignore).unwrap();
        let table = db.create_table(TABLE, schema(), ConflictType::Error).unwrap();
        table.insert(rows(ROWS, 7)).unwrap();
        db
    }

    fn knn(
        db: &Database,
        column: &str,
        embedding: JsonValue,
        element_type: &str,
        metric: &str,
        top_n: JsonValue,
    ) -> knn_engine::Result<KnnResult> {
        let request = KnnRequest::new(column, &embedding, element_type, metric, &top_n)?
            .with_output(["variant_id", "_row_id"]);
        db.knn_search(TABLE, &request)
    }

    fn hnsw(column: &str, metric: &str) -> Vec<IndexInfo> {
        vec![IndexInfo::new(
            column,
            IndexKind::Hnsw,
            vec![
                InitParameter::new("M", "16"),
                InitParameter::new("ef_construction", "50"),
                InitParameter::new("ef", "50"),
                InitParameter::new("metric", metric),
            ],
        )]
    }

    fn assert_ranked(result: &KnnResult, metric: &str, top_n: usize) {
        assert!(!result.is_empty());
        assert!(result.len() <= top_n);

        let unique: HashSet<RowId> = result.row_ids().into_iter().collect();
        assert_eq!(unique.len(), result.len());

        let scores = result.scores();
        for pair in scores.windows(2) {
            match metric {
                "ip" => assert!(pair[0] >= pair[1]),
                _ => assert!(pair[0] <= pair[1]),
            }
        }
    }

    #[test]
    fn test_knn_with_row_id_output() {
        let db = database(64);
        let result = knn(&db, "gender_vector", json!([1.0, 1.0, 1.0, 1.0]), "float", "ip", json!(10)).unwrap();

        assert_eq!(result.len(), 10);
        assert_ranked(&result, "ip", 10);
        for (row, output) in result.rows.iter().zip(&result.output) {
            assert!(matches!(&output[0], Value::Varchar(name) if name.starts_with("variant_")));
            assert_eq!(output[1], Value::Integer(row.row_id.as_u64() as i64));
        }
    }

    #[test]
    fn test_various_vector_column_name() {
        let db = database(64);
        for column in ["gender_vector", "color_vector"] {
            let result = knn(&db, column, json!([1.0, 1.0, 1.0, 1.0]), "float", "ip", json!(2)).unwrap();
            assert_ranked(&result, "ip", 2);
        }
        for column in ["variant_id", "query_price"] {
            let error = knn(&db, column, json!([1.0, 1.0, 1.0, 1.0]), "float", "ip", json!(2)).unwrap_err();
            assert!(matches!(error, KnnError::NotAVectorColumn(_)));
        }
    }

    #[test]
    fn test_various_embedding_data() {
        let db = database(64);
        for embedding in [
            json!("variant_id"),
            json!("gender_vector"),
            json!(1),
            json!(2.4),
            json!([1, 1, 1]),
            json!([1, 2, 3]),
            json!({"c": "12"}),
        ] {
            let error = knn(&db, "gender_vector", embedding, "float", "ip", json!(2)).unwrap_err();
            assert!(matches!(error, KnnError::InvalidEmbedding(_)));
            assert_eq!(error.code(), ERR_INVALID_ARGUMENT);
        }
        for embedding in [json!([1, 1, 1, 1]), json!([1, 2, 3, 4])] {
            let result = knn(&db, "gender_vector", embedding, "float", "ip", json!(2)).unwrap();
            assert_ranked(&result, "ip", 2);
        }
    }

    #[test]
    fn test_various_embedding_data_type() {
        let db = database(64);
        for embedding in [
            json!([1, 1, 1, 1]),
            json!([1.0, 1.0, 1.0, 1.0]),
            json!([1.5, 1, 1, 1]),
        ] {
            let error = knn(&db, "gender_vector", embedding.clone(), "int", "ip", json!(2)).unwrap_err();
            assert_eq!(error.code(), ERR_NOT_SUPPORTED);
            assert!(error.to_string().starts_with("ERROR:3032"));

            let result = knn(&db, "gender_vector", embedding.clone(), "float", "ip", json!(2)).unwrap();
            assert_ranked(&result, "ip", 2);

            for token in ["1", "2.2", "#@!$!@"] {
                let error = knn(&db, "gender_vector", embedding.clone(), token, "ip", json!(2)).unwrap_err();
                assert!(matches!(error, KnnError::InvalidElementType(_)));
            }
        }
    }

    #[test]
    fn test_insert_with_omitted_column() {
        let db = database(64);
        let table = db.get_table(TABLE).unwrap();

        let mut row = Row::new().with("variant_id", "123");
        for name in VECTOR_COLUMNS {
            row = row.with(name, vec![1.0f32, 1.0, 1.0, 1.0]);
        }
        let short = row
            .clone()
            .with("query_is_recommend", "ok")
            .with("query_gender", "varchar")
            .with("query_price", 1.0);

        let error = table.insert(vec![short.clone()]).unwrap_err();
        assert!(matches!(error, KnnError::InvalidRow(_)));
        assert!(error.to_string().contains("value count mismatch"));
        assert_eq!(table.row_count(), ROWS);

        table.insert(vec![short.with("query_color", Value::Null)]).unwrap();
        assert_eq!(table.row_count(), ROWS + 1);
    }

    #[test]
    fn test_various_distance_type() {
        let db = database(64);
        for embedding in [json!([1, 1, 1, 1]), json!([1.0, 1.0, 1.0, 1.0])] {
            for (metric, supported) in [("l2", true), ("cosine", false), ("ip", true), ("hamming", false)] {
                let result = knn(&db, "gender_vector", embedding.clone(), "float", metric, json!(2));
                if supported {
                    assert_ranked(&result.unwrap(), metric, 2);
                } else {
                    let error = result.unwrap_err();
                    assert_eq!(error.code(), ERR_NOT_SUPPORTED);
                    assert!(error.to_string().starts_with("ERROR:3032"));
                }
            }
        }
    }

    #[test]
    fn test_various_topn() {
        let db = database(64);
        for top_n in [2, 10] {
            let result = knn(&db, "gender_vector", json!([1, 1, 1, 1]), "float", "l2", json!(top_n)).unwrap();
            assert_eq!(result.len(), top_n);
        }
        for top_n in [0, -1] {
            let error = knn(&db, "gender_vector", json!([1, 1, 1, 1]), "float", "l2", json!(top_n)).unwrap_err();
            assert_eq!(error.code(), ERR_INVALID_TOPN);
            assert!(error.to_string().starts_with("ERROR:3014"));
        }
        for top_n in [json!(1.1), json!("test"), json!({}), json!([]), json!([1, 1, 1, 1])] {
            let error = knn(&db, "gender_vector", json!([1, 1, 1, 1]), "float", "l2", top_n).unwrap_err();
            assert!(matches!(error, KnnError::InvalidTopNType(_)));
            assert_ne!(error.code(), ERR_INVALID_TOPN);
            assert!(error.to_string().contains("Invalid topn"));
        }
    }

    #[test]
    fn test_top_n_larger_than_table() {
        let db = database(64);
        let result = knn(&db, "tag_vector", json!([0.5, 0.5, 0.5, 0.5]), "float", "l2", json!(ROWS + 50)).unwrap();
        assert_eq!(result.len(), ROWS);
    }

    #[test]
    fn test_with_index_before() {
        for index_column in VECTOR_COLUMNS {
            for index_metric in ["l2", "ip"] {
                let db = Database::new();
                let table = db.create_table(TABLE, schema(), ConflictType::Error).unwrap();
                db.create_index(TABLE, "my_index", hnsw(index_column, index_metric), ConflictType::Error)
                    .unwrap();
                table.insert(rows(ROWS, 11)).unwrap();

                for knn_column in VECTOR_COLUMNS {
                    for knn_metric in ["l2", "ip"] {
                        let result = knn(&db, knn_column, json!([1, 1, 1, 1]), "float", knn_metric, json!(5)).unwrap();
                        assert_eq!(result.len(), 5);
                        assert_ranked(&result, knn_metric, 5);

                        let indexed = index_column == knn_column && index_metric == knn_metric;
                        assert_eq!(
                            result.path,
                            if indexed {
                                SearchPath::Index("my_index".to_string())
                            } else {
                                SearchPath::BruteForce
                            }
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_with_index_after() {
        for index_column in VECTOR_COLUMNS {
            for index_metric in ["l2", "ip"] {
                let db = database(32);
                for knn_column in VECTOR_COLUMNS {
                    for knn_metric in ["l2", "ip"] {
                        let before = knn(&db, knn_column, json!([1.0, 1.0, 1.0, 1.0]), "float", knn_metric, json!(5)).unwrap();
                        assert_eq!(before.path, SearchPath::BruteForce);
                        assert_ranked(&before, knn_metric, 5);
                    }
                }

                db.drop_index(TABLE, "my_index", ConflictType::Ignore).unwrap();
                db.create_index(TABLE, "my_index", hnsw(index_column, index_metric), ConflictType::Error)
                    .unwrap();

                for knn_column in VECTOR_COLUMNS {
                    for knn_metric in ["l2", "ip"] {
                        let after = knn(&db, knn_column, json!([1.0, 1.0, 1.0, 1.0]), "float", knn_metric, json!(5)).unwrap();
                        assert_eq!(after.len(), 5);
                        assert_ranked(&after, knn_metric, 5);
                    }
                }
            }
        }
    }

    #[test]
    fn test_index_does_not_change_exact_answer_on_small_table() {
        let db = database(64);
        let exact = knn(&db, "color_vector", json!([0.2, 0.4, 0.6, 0.8]), "float", "l2", json!(5)).unwrap();

        db.create_index(TABLE, "idx", hnsw("color_vector", "l2"), ConflictType::Error).unwrap();
        let approx = knn(&db, "color_vector", json!([0.2, 0.4, 0.6, 0.8]), "float", "l2", json!(5)).unwrap();

        assert_eq!(approx.path, SearchPath::Index("idx".to_string()));
        assert_eq!(approx.row_ids(), exact.row_ids());
    }

    #[test]
    fn test_inner_product_round_trip() {
        let db = database(64);
        let table = db.get_table(TABLE).unwrap();
        let mut row = rows(1, 99).remove(0);
        row = row.with("other_vector", vec![10.0f32, 10.0, 10.0, 10.0]);
        let inserted = table.insert(vec![row]).unwrap()[0];

        let result = knn(&db, "other_vector", json!([10, 10, 10, 10]), "float", "ip", json!(1)).unwrap();
        assert_eq!(result.row_ids(), vec![inserted]);
        assert_eq!(result.scores(), vec![400.0]);
    }

    #[test]
    fn test_brute_force_is_deterministic() {
        let db = database(16);
        let first = knn(&db, "category_vector", json!([0.5, 0.5, 0.5, 0.5]), "float", "l2", json!(20)).unwrap();
        for _ in 0..5 {
            let again = knn(&db, "category_vector", json!([0.5, 0.5, 0.5, 0.5]), "float", "l2", json!(20)).unwrap();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_rows_appended_after_index_are_found() {
        let db = database(64);
        db.create_index(TABLE, "idx", hnsw("gender_vector", "l2"), ConflictType::Error).unwrap();
        let table = db.get_table(TABLE).unwrap();

        let row = rows(1, 5).remove(0).with("gender_vector", vec![-3.0f32, -3.0, -3.0, -3.0]);
        let inserted = table.insert(vec![row]).unwrap()[0];

        let result = knn(&db, "gender_vector", json!([-3, -3, -3, -3]), "float", "l2", json!(1)).unwrap();
        assert_eq!(result.path, SearchPath::Index("idx".to_string()));
        assert_eq!(result.row_ids(), vec![inserted]);
        assert_eq!(table.index_part("idx", "gender_vector").unwrap().len(), ROWS + 1);
    }

    #[test]
    fn test_saved_index_answers_the_same() {
        let db = database(64);
        db.create_index(TABLE, "idx", hnsw("tag_vector", "ip"), ConflictType::Error).unwrap();
        let part = db.get_table(TABLE).unwrap().index_part("idx", "tag_vector").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tag_vector.idx");
        part.save(&mut File::create(&path).unwrap()).unwrap();
        let loaded = HnswIndex::load_index(&mut File::open(&path).unwrap()).unwrap();

        let query = [0.3f32, 0.1, 0.9, 0.5];
        assert_eq!(loaded.len(), ROWS);
        assert_eq!(loaded.metric(), DistanceMetric::InnerProduct);
        assert_eq!(loaded.search(&query, 5, 50), part.search(&query, 5));
    }

    #[test]
    fn test_concurrent_inserts_and_queries() {
        let db = Arc::new(database(32));
        db.create_index(TABLE, "idx", hnsw("gender_vector", "l2"), ConflictType::Error).unwrap();

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    let table = db.get_table(TABLE).unwrap();
                    for batch in 0..5 {
                        table.insert(rows(10, 100 + w * 10 + batch)).unwrap();
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    for metric in ["l2", "ip", "l2", "ip"] {
                        let result = knn(&db, "gender_vector", json!([0.5, 0.5, 0.5, 0.5]), "float", metric, json!(5)).unwrap();
                        assert_eq!(result.len(), 5);
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().unwrap();
        }

        let table = db.get_table(TABLE).unwrap();
        assert_eq!(table.row_count(), ROWS + 200);
        assert_eq!(table.index_part("idx", "gender_vector").unwrap().len(), ROWS + 200);
    }

    #[test]
    fn test_queries_during_index_build_and_replace() {
        let db = Arc::new(database(32));

        let builder = {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                db.create_index(TABLE, "idx", hnsw("gender_vector", "l2"), ConflictType::Error).unwrap();
                for metric in ["ip", "l2", "ip"] {
                    db.create_index(TABLE, "idx", hnsw("gender_vector", metric), ConflictType::Replace)
                        .unwrap();
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    for round in 0..20 {
                        let metric = if round % 2 == 0 { "l2" } else { "ip" };
                        let result = knn(&db, "gender_vector", json!([0.5, 0.5, 0.5, 0.5]), "float", metric, json!(5)).unwrap();
                        assert_eq!(result.len(), 5);
                        assert_ranked(&result, metric, 5);
                    }
                })
            })
            .collect();

        for handle in readers.into_iter().chain(std::iter::once(builder)) {
            handle.join().unwrap();
        }

        let table = db.get_table(TABLE).unwrap();
        assert_eq!(table.index_names(), vec!["idx".to_string()]);
        let part = table.index_part("idx", "gender_vector").unwrap();
        assert_eq!(part.len(), ROWS);
        assert_eq!(part.metric(), DistanceMetric::InnerProduct);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_brute_force_matches_full_sort(
            data in prop::collection::vec(prop::collection::vec(-10.0f32..10.0, 3), 1..60),
            query in prop::collection::vec(-10.0f32..10.0, 3),
            top_n in 1usize..20,
            inner_product in any::<bool>(),
        ) {
            let metric = if inner_product { DistanceMetric::InnerProduct } else { DistanceMetric::L2 };
            let db = Database::with_config(DatabaseConfig { segment_capacity: 7, ..DatabaseConfig::default() }).unwrap();
            let table = db
                .create_table("p", TableSchema::from_pairs(&[("v", "vector,3,float")]).unwrap(), ConflictType::Error)
                .unwrap();
            let ids = table
                .insert(data.iter().map(|v| Row::new().with("v", v.clone())).collect())
                .unwrap();

            let request = KnnRequest::new(
                "v",
                &json!(query),
                "float",
                metric.name(),
                &json!(top_n),
            )
            .unwrap();
            let result = table.knn(&request).unwrap();

            let expected = linscan::scan_vectors(
                ids.iter().copied().zip(data.iter().map(|v| v.as_slice())),
                &query,
                metric,
                top_n,
            );
            prop_assert_eq!(result.rows, expected);
            prop_assert_eq!(result.path, SearchPath::BruteForce);
        }

        #[test]
        fn prop_results_are_ranked_and_unique(
            data in prop::collection::vec(prop::collection::vec(-5.0f32..5.0, 2), 1..40),
            top_n in 1i64..50,
        ) {
            let db = Database::new();
            let table = db
                .create_table("p", TableSchema::from_pairs(&[("v", "vector,2,float")]).unwrap(), ConflictType::Error)
                .unwrap();
            table
                .insert(data.iter().map(|v| Row::new().with("v", v.clone())).collect())
                .unwrap();
            db.create_index("p", "idx", hnsw("v", "l2"), ConflictType::Error).unwrap();

            let request = KnnRequest::new("v", &json!([0.0, 0.0]), "float", "l2", &json!(top_n)).unwrap();
            let result = table.knn(&request).unwrap();

            prop_assert!(!result.is_empty());
            prop_assert!(result.len() <= top_n as usize);
            let unique: HashSet<RowId> = result.row_ids().into_iter().collect();
            prop_assert_eq!(unique.len(), result.len());
            for pair in result.scores().windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
        }
    }
}
