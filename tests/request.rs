use csv_loader::{
    Error, PlanOptions, StructuralError, ValidationError,
    request::{ResolvedView, RowUpdate, RowWrite, UploadRequest, parse_index},
    statements::{RowRange, SortOrder, StatementKind},
};

fn tables() -> Vec<String> {
    vec!["people".to_string(), "cities".to_string()]
}

fn columns() -> Vec<String> {
    vec!["name".to_string(), "age".to_string(), "city".to_string()]
}

#[test]
fn index_parameters_must_be_plain_integers() {
    assert_eq!(parse_index("col", "2"), Ok(2));
    assert_eq!(parse_index("col", " 7 "), Ok(7));
    for bad in ["", "1.5", "-1", "1,2", "abc", "99999999999"] {
        assert!(
            matches!(
                parse_index("col", bad),
                Err(ValidationError::NotAnInteger { .. })
            ),
            "{bad:?} should be rejected"
        );
    }
}

#[test]
fn upload_without_a_name_falls_back_to_the_file_name() {
    let upload = UploadRequest {
        name: "",
        file_name: "people",
        content: "name,age\nAlice,30\n",
    };
    let prepared = upload.prepare(PlanOptions::default(), 10).expect("prepare");
    assert_eq!(prepared.plan.table_name(), "people");
    assert_eq!(
        prepared.issues,
        vec!["Empty name field, using filename as fallback.".to_string()]
    );
}

#[test]
fn upload_with_inconsistent_lines_is_refused() {
    let upload = UploadRequest {
        name: "pairs",
        file_name: "pairs.csv",
        content: "a,b\n1,2,3\n",
    };
    let err = upload.prepare(PlanOptions::default(), 10).unwrap_err();
    assert!(matches!(err, Error::Structural(StructuralError::ShapeSample)));
}

#[test]
fn upload_of_empty_content_is_a_validation_error() {
    let upload = UploadRequest {
        name: "t",
        file_name: "t.csv",
        content: "",
    };
    let err = upload.prepare(PlanOptions::default(), 10).unwrap_err();
    assert!(matches!(err, Error::Validation(ValidationError::EmptyContent)));
}

#[test]
fn view_resolves_columns_sorts_and_range() {
    let params = [
        ("name", "people"),
        ("col", "0"),
        ("col", "2"),
        ("asc", "1"),
        ("desc", "0"),
        ("from", "10"),
        ("to", "20"),
    ];
    let view = ResolvedView::resolve(&params, &tables(), &columns()).expect("view");
    assert_eq!(view.table, "people");
    assert_eq!(view.columns, vec!["name".to_string(), "city".to_string()]);
    assert_eq!(
        view.sorts,
        vec![
            ("age".to_string(), SortOrder::Ascending),
            ("name".to_string(), SortOrder::Descending)
        ]
    );
    assert_eq!(view.range, RowRange { from: 10, to: 20 });
    assert!(view.issues.is_empty());
    assert_eq!(view.statement().kind, StatementKind::SelectView);
}

#[test]
fn view_reports_bad_indices_as_issues() {
    let params = [
        ("name", "people"),
        ("col", "9"),
        ("col", "x"),
        ("from", "-5"),
    ];
    let view = ResolvedView::resolve(&params, &tables(), &columns()).expect("view");
    assert!(view.columns.is_empty());
    assert_eq!(view.range, RowRange::default());
    assert_eq!(view.issues.len(), 3);
    assert!(view.issues[0].contains("out of bounds"));
    assert!(view.issues[1].starts_with("Invalid indexing"));
}

#[test]
fn later_sort_on_the_same_column_replaces_the_earlier_one() {
    let params = [("name", "people"), ("asc", "1"), ("desc", "1")];
    let view = ResolvedView::resolve(&params, &tables(), &columns()).expect("view");
    assert_eq!(view.sorts, vec![("age".to_string(), SortOrder::Descending)]);
}

#[test]
fn view_of_unknown_or_unnamed_table_is_refused() {
    let params = [("name", "ghosts")];
    assert_eq!(
        ResolvedView::resolve(&params, &tables(), &columns()).unwrap_err(),
        ValidationError::UnknownTable("ghosts".to_string())
    );
    let params: [(&str, &str); 0] = [];
    assert_eq!(
        ResolvedView::resolve(&params, &tables(), &columns()).unwrap_err(),
        ValidationError::MissingParam("name".to_string())
    );
}

#[test]
fn row_update_within_table_size_updates_in_place() {
    let update = RowUpdate::resolve(
        "people",
        Some("3"),
        Some(r#"{"age":"31"}"#),
        &tables(),
        &columns(),
        5,
    )
    .expect("update");
    assert_eq!(update.write, RowWrite::Update { rowid: 3 });
    assert_eq!(update.statement().kind, StatementKind::UpdateRow);
}

#[test]
fn row_update_past_the_end_appends() {
    let update = RowUpdate::resolve(
        "people",
        Some("6"),
        Some(r#"{"name":"Dora","age":"22"}"#),
        &tables(),
        &columns(),
        5,
    )
    .expect("update");
    assert_eq!(update.write, RowWrite::Append);
    assert_eq!(update.statement().kind, StatementKind::AppendRow);
}

#[test]
fn row_update_rejects_bad_bodies() {
    let resolve = |body: &str| {
        RowUpdate::resolve("people", Some("1"), Some(body), &tables(), &columns(), 5)
    };
    assert!(resolve(r#"{"age":"31",}"#).unwrap_err().is_structural());
    assert!(matches!(
        resolve("{}").unwrap_err(),
        Error::Validation(ValidationError::EmptyRow)
    ));
    assert!(matches!(
        resolve(r#"{"salary":"1"}"#).unwrap_err(),
        Error::Validation(ValidationError::UnknownColumn { .. })
    ));
}

#[test]
fn row_update_requires_table_and_rowid() {
    let err = RowUpdate::resolve("ghosts", Some("1"), Some("{}"), &tables(), &columns(), 5)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::UnknownTable(_))
    ));
    let err = RowUpdate::resolve("people", None, Some("{}"), &tables(), &columns(), 5)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::MissingParam(_))
    ));
    let err = RowUpdate::resolve("people", Some("1.0"), Some("{}"), &tables(), &columns(), 5)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::NotAnInteger { .. })
    ));
}
