// ==========================================
// 读数导入端到端测试
// ==========================================
// 覆盖: 完整导入流程、幂等、致命错误无副作用、文件内重复、提交阶段回滚
// ==========================================

use meter_import::api::{ApiError, ImportApi, ImportOverrides};
use meter_import::config::{config_keys, ImportConfig};
use meter_import::domain::{ImportOutcome, RejectionKind};
use meter_import::importer::{ImportError, ReadingImporter};
use std::path::PathBuf;
use tempfile::TempDir;

mod test_helpers;
use test_helpers::{
    build_importer, count_rows, create_test_db, reading_value, seed_device, write_input,
};

const SCENARIO_CSV: &str = "fecha;consumo;medidor\n\
15/03/2024 08:00;12,5;M1\n\
15/03/2024 08:00;abc;M1\n\
15/03/2024 09:00;5.0;M2\n";

// ==========================================
// 场景 A/B/C
// ==========================================

#[tokio::test]
async fn test_scenario_commit_value_error_and_missing_device() {
    let db = create_test_db().unwrap();
    seed_device(&db, 1, "M1");
    let dir = TempDir::new().unwrap();
    let file = write_input(&dir, "lecturas.csv", SCENARIO_CSV);

    let report = build_importer(&db).import_file(&file).await.unwrap();

    assert_eq!(report.total_rows, 3);
    assert_eq!(report.committed, 1);
    assert_eq!(report.rejected_rows, 1);
    assert_eq!(report.rejections_by_kind.get(&RejectionKind::InvalidValue), Some(&1));
    assert_eq!(report.skipped_device_not_found, 1);
    assert_eq!(report.devices_not_found, vec!["M2".to_string()]);
    assert_eq!(report.outcome, ImportOutcome::Partial);

    assert_eq!(count_rows(&db, "reading"), 1);
    assert_eq!(reading_value(&db, 1, "2024-03-15 08:00:00"), Some(12.5));
    // 未知设备不会被隐式创建
    assert_eq!(count_rows(&db, "device"), 1);
    // 运行记录已落库，暂存表已清空
    assert_eq!(count_rows(&db, "import_run"), 1);
    assert_eq!(count_rows(&db, "staging_reading"), 0);
}

#[tokio::test]
async fn test_same_file_twice_commits_nothing_new() {
    let db = create_test_db().unwrap();
    seed_device(&db, 1, "M1");
    let dir = TempDir::new().unwrap();
    let file = write_input(
        &dir,
        "lecturas.csv",
        "fecha,consumo,medidor\n01/02/2024 10:00,1.5,M1\n01/02/2024 11:00,2.5,M1\n",
    );
    let importer = build_importer(&db);

    let first = importer.import_file(&file).await.unwrap();
    assert_eq!(first.committed, 2);
    assert_eq!(first.outcome, ImportOutcome::Complete);

    let second = importer.import_file(&file).await.unwrap();
    assert_eq!(second.committed, 0);
    assert_eq!(second.skipped_duplicate, 2);
    assert_eq!(second.outcome, ImportOutcome::NothingCommitted);
    assert_eq!(count_rows(&db, "reading"), 2);
    assert_eq!(count_rows(&db, "import_run"), 2);
}

#[tokio::test]
async fn test_existing_reading_left_unchanged() {
    let db = create_test_db().unwrap();
    seed_device(&db, 1, "M1");
    {
        let conn = db.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO reading (read_at, value, device_id) VALUES ('2024-02-01 10:00:00', 99.0, 1)",
            [],
        )
        .unwrap();
    }
    let dir = TempDir::new().unwrap();
    let file = write_input(&dir, "lecturas.csv", "fecha,consumo,medidor\n01/02/2024 10:00,1.5,M1\n");

    let report = build_importer(&db).import_file(&file).await.unwrap();

    assert_eq!(report.skipped_duplicate, 1);
    assert_eq!(report.committed, 0);
    assert_eq!(reading_value(&db, 1, "2024-02-01 10:00:00"), Some(99.0));
}

#[tokio::test]
async fn test_in_file_duplicate_keeps_first_occurrence() {
    let db = create_test_db().unwrap();
    seed_device(&db, 1, "M1");
    let dir = TempDir::new().unwrap();
    let file = write_input(
        &dir,
        "lecturas.csv",
        "fecha,consumo,medidor\n01/02/2024 10:00,1.5,M1\n01/02/2024 10:00,7.0,M1\n",
    );

    let report = build_importer(&db).import_file(&file).await.unwrap();

    assert_eq!(report.staged_candidates, 2);
    assert_eq!(report.staged_rows, 1);
    assert_eq!(report.in_file_duplicates, 1);
    assert_eq!(report.committed, 1);
    assert_eq!(reading_value(&db, 1, "2024-02-01 10:00:00"), Some(1.5));
}

#[tokio::test]
async fn test_three_date_precisions_resolve_to_same_day() {
    let db = create_test_db().unwrap();
    seed_device(&db, 1, "M1");
    seed_device(&db, 2, "M2");
    seed_device(&db, 3, "M3");
    let dir = TempDir::new().unwrap();
    let file = write_input(
        &dir,
        "lecturas.csv",
        "fecha,consumo,medidor\n01/02/2024 10:30,1,M1\n01/02/2024 10,2,M2\n01/02/2024,3,M3\n",
    );

    let report = build_importer(&db).import_file(&file).await.unwrap();

    assert_eq!(report.committed, 3);
    assert_eq!(reading_value(&db, 1, "2024-02-01 10:30:00"), Some(1.0));
    assert_eq!(reading_value(&db, 2, "2024-02-01 10:00:00"), Some(2.0));
    assert_eq!(reading_value(&db, 3, "2024-02-01 00:00:00"), Some(3.0));
}

// ==========================================
// 电子表格输入
// ==========================================

fn workbook_fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/datasets/lecturas.xlsx")
}

#[tokio::test]
async fn test_spreadsheet_import_end_to_end() {
    let db = create_test_db().unwrap();
    seed_device(&db, 1, "101");
    seed_device(&db, 2, "M1");

    let report = build_importer(&db).import_file(&workbook_fixture()).await.unwrap();

    assert_eq!(report.file_name.as_deref(), Some("lecturas.xlsx"));
    assert_eq!(report.total_rows, 4);
    assert_eq!(report.committed, 2);
    assert_eq!(report.outcome, ImportOutcome::Partial);

    // 日期单元格（ISO）+ 数值设备名
    assert_eq!(reading_value(&db, 1, "2024-03-15 06:00:00"), Some(12.5));
    // 文本日期走日在前格式，逗号小数
    assert_eq!(reading_value(&db, 2, "2024-03-15 09:00:00"), Some(7.5));
    // 第二个工作表不导入
    assert_eq!(count_rows(&db, "reading"), 2);

    let rejected: Vec<(usize, RejectionKind)> = report
        .rejection_examples
        .iter()
        .map(|r| (r.row_number, r.kind))
        .collect();
    assert_eq!(
        rejected,
        vec![(4, RejectionKind::InvalidDate), (5, RejectionKind::InvalidValue)]
    );
}

// ==========================================
// 致命错误：不修改任何表
// ==========================================

#[tokio::test]
async fn test_empty_file_aborts_without_mutation() {
    let db = create_test_db().unwrap();
    seed_device(&db, 1, "M1");
    {
        let conn = db.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO staging_reading (read_at, value, device_name) VALUES ('2024-01-01 00:00:00', 1.0, 'M1')",
            [],
        )
        .unwrap();
    }
    let dir = TempDir::new().unwrap();
    let importer = build_importer(&db);

    for content in ["", "fecha,consumo,medidor\n", "fecha,consumo,medidor\n\n\n"] {
        let file = write_input(&dir, "vacio.csv", content);
        let err = importer.import_file(&file).await.unwrap_err();
        assert!(matches!(err, ImportError::EmptyFile), "{content:?}: {err:?}");
    }

    assert_eq!(count_rows(&db, "staging_reading"), 1);
    assert_eq!(count_rows(&db, "reading"), 0);
    assert_eq!(count_rows(&db, "import_run"), 0);
}

#[tokio::test]
async fn test_missing_columns_named() {
    let db = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let file = write_input(&dir, "lecturas.csv", "Fecha,lectura,Medidor\n01/02/2024,1,M1\n");

    let err = build_importer(&db).import_file(&file).await.unwrap_err();
    match err {
        ImportError::MissingRequiredColumns { missing, .. } => {
            assert_eq!(missing, vec!["consumo".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(count_rows(&db, "import_run"), 0);
}

#[tokio::test]
async fn test_unsupported_extension() {
    let db = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let file = write_input(&dir, "lecturas.json", "{}");

    let err = build_importer(&db).import_file(&file).await.unwrap_err();
    assert!(matches!(err, ImportError::UnsupportedFileFormat(_)));
}

#[tokio::test]
async fn test_commit_failure_rolls_back_and_keeps_staging() {
    let db = create_test_db().unwrap();
    seed_device(&db, 1, "M1");
    {
        let conn = db.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reading_reject BEFORE INSERT ON reading
             BEGIN SELECT RAISE(ABORT, 'reading locked'); END;",
        )
        .unwrap();
    }
    let dir = TempDir::new().unwrap();
    let file = write_input(
        &dir,
        "lecturas.csv",
        "fecha,consumo,medidor\n01/02/2024 10:00,1.5,M1\n01/02/2024 11:00,2.5,M1\n",
    );

    let err = build_importer(&db).import_file(&file).await.unwrap_err();

    assert!(matches!(err, ImportError::StorageConstraintViolation(_)), "{err:?}");
    assert_eq!(count_rows(&db, "reading"), 0);
    assert_eq!(count_rows(&db, "import_run"), 0);
    assert_eq!(count_rows(&db, "staging_reading"), 2);
}

// ==========================================
// 配置
// ==========================================

#[tokio::test]
async fn test_stored_config_comma_decimal_and_month_first() {
    let db = create_test_db().unwrap();
    seed_device(&db, 1, "M1");
    let api = ImportApi::from_connection(db.conn.clone()).unwrap();
    api.set_config_value(config_keys::DECIMAL_SEPARATOR, ",").unwrap();
    api.set_config_value(config_keys::DAY_FIRST, "false").unwrap();

    let dir = TempDir::new().unwrap();
    let file = write_input(
        &dir,
        "lecturas.txt",
        "fecha;consumo;medidor\n02/01/2024 10:00;1.234,5;M1\n",
    );

    let report = api.import_file(&file, &ImportOverrides::default()).await.unwrap();

    assert_eq!(report.committed, 1);
    assert_eq!(reading_value(&db, 1, "2024-02-01 10:00:00"), Some(1234.5));
}

#[tokio::test]
async fn test_keep_staging_override() {
    let db = create_test_db().unwrap();
    seed_device(&db, 1, "M1");
    let api = ImportApi::from_connection(db.conn.clone()).unwrap();
    let dir = TempDir::new().unwrap();
    let file = write_input(&dir, "lecturas.csv", "fecha,consumo,medidor\n01/02/2024 10:00,1.5,M1\n");

    let overrides = ImportOverrides {
        keep_staging: true,
        ..Default::default()
    };
    api.import_file(&file, &overrides).await.unwrap();

    assert_eq!(api.staged_count().unwrap(), 1);
    assert_eq!(count_rows(&db, "reading"), 1);
}

#[tokio::test]
async fn test_explicit_config_bypasses_store() {
    let db = create_test_db().unwrap();
    seed_device(&db, 1, "M1");
    let dir = TempDir::new().unwrap();
    let file = write_input(&dir, "lecturas.tsv", "fecha\tconsumo\tmedidor\n2024-02-01 10:00\t3\tM1\n");

    let config = ImportConfig::default().with_date_formats(vec!["%Y-%m-%d %H:%M".to_string()]);
    let report = build_importer(&db)
        .import_file_with_config(&file, &config)
        .await
        .unwrap();

    assert_eq!(report.committed, 1);
}

#[tokio::test]
async fn test_configured_seconds_format_keeps_time_of_day() {
    let db = create_test_db().unwrap();
    seed_device(&db, 1, "M1");
    let dir = TempDir::new().unwrap();
    let file = write_input(
        &dir,
        "lecturas.csv",
        "fecha,consumo,medidor
01/02/2024 08:00:00,1,M1
01/02/2024 09:15:30,2,M1
",
    );

    let config = ImportConfig::default().with_date_formats(vec!["%d/%m/%Y %T".to_string()]);
    let report = build_importer(&db)
        .import_file_with_config(&file, &config)
        .await
        .unwrap();

    assert_eq!(report.committed, 2);
    assert_eq!(report.in_file_duplicates, 0);
    assert_eq!(reading_value(&db, 1, "2024-02-01 09:15:30"), Some(2.0));
}

// ==========================================
// 查询接口
// ==========================================

#[tokio::test]
async fn test_deltas_and_run_log() {
    let db = create_test_db().unwrap();
    seed_device(&db, 1, "M1");
    let api = ImportApi::from_connection(db.conn.clone()).unwrap();
    let dir = TempDir::new().unwrap();
    let file = write_input(
        &dir,
        "lecturas.csv",
        "fecha,consumo,medidor\n01/02/2024 10:00,100,M1\n01/02/2024 11:00,112.5,M1\n01/02/2024 12:00,130,M1\n",
    );

    let report = api.import_file(&file, &ImportOverrides::default()).await.unwrap();
    assert_eq!(report.committed, 3);

    let deltas = api.consumption_deltas("M1", 10).unwrap();
    assert_eq!(deltas.len(), 3);
    assert_eq!(deltas[0].delta, Some(17.5));
    assert_eq!(deltas[1].delta, Some(12.5));
    assert_eq!(deltas[2].previous_value, None);

    let runs = api.recent_runs(5).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_id, report.run_id);
    assert_eq!(runs[0].committed_rows, 3);
    assert_eq!(runs[0].file_name.as_deref(), Some("lecturas.csv"));

    let stored = api.run_report(&report.run_id).unwrap();
    assert_eq!(stored.committed, 3);
    assert_eq!(stored.outcome, ImportOutcome::Complete);

    assert!(matches!(
        api.consumption_deltas("M9", 10).unwrap_err(),
        ApiError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_api_error_for_empty_file() {
    let db = create_test_db().unwrap();
    let api = ImportApi::open(&db.path).unwrap();
    let dir = TempDir::new().unwrap();
    let file = write_input(&dir, "vacio.csv", "fecha,consumo,medidor\n");

    let err = api.import_file(&file, &ImportOverrides::default()).await.unwrap_err();
    assert!(matches!(err, ApiError::EmptyFile));
    assert!(!err.localized_message().is_empty());
}
