mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{FakeFile, FakeLake};

async fn lake_with(name: &str, file: FakeFile) -> Result<(FakeLake, employee_api_rust::AppState)> {
    let lake = FakeLake::start(vec![(name, file)]).await?;
    let config = common::config_with_file(Some(lake.file_url(name)));
    let state = common::state(config, common::static_credential());
    Ok((lake, state))
}

#[tokio::test]
async fn filters_case_insensitively_and_averages() -> Result<()> {
    let csv = common::employees_csv(&[
        (1, "Ada", "IT", 100),
        (2, "Grace", "it", 200),
        (3, "Linus", "HR", 300),
    ]);
    let (_lake, state) = lake_with("employees.csv", FakeFile::csv(csv)).await?;

    let res = common::get_path(state, "/employees?department=IT").await?;
    assert_eq!(res.status, StatusCode::OK);

    let body = res.json()?;
    assert_eq!(body["total"], 2);
    assert_eq!(body["department"], "IT");
    assert_eq!(body["averageSalary"], 150);
    let items = body["items"].as_array().expect("items array");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], 1);
    assert_eq!(items[0]["name"], "Ada");
    assert_eq!(items[1]["id"], 2);
    assert_eq!(items[1]["salary"], 200.0);
    Ok(())
}

#[tokio::test]
async fn no_matches_returns_empty_result() -> Result<()> {
    let csv = common::employees_csv(&[(1, "Ada", "IT", 100)]);
    let (_lake, state) = lake_with("employees.csv", FakeFile::csv(csv)).await?;

    let body = common::get_path(state, "/employees?department=Sales").await?.json()?;
    assert_eq!(body["total"], 0);
    assert_eq!(body["averageSalary"], 0);
    assert_eq!(body["department"], "Sales");
    assert_eq!(body["items"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn caps_items_at_fifty_in_source_order() -> Result<()> {
    let rows: Vec<(i64, String, &str, i64)> = (1..=70)
        .map(|i| (i, format!("E{i}"), if i <= 60 { "Ops" } else { "HR" }, 1000 + i))
        .collect();
    let rows: Vec<(i64, &str, &str, i64)> =
        rows.iter().map(|(i, n, d, s)| (*i, n.as_str(), *d, *s)).collect();
    let (_lake, state) = lake_with("employees.csv", FakeFile::csv(common::employees_csv(&rows))).await?;

    let body = common::get_path(state, "/employees?department=%20ops%20").await?.json()?;
    assert_eq!(body["total"], 60);
    let items = body["items"].as_array().expect("items array");
    assert_eq!(items.len(), 50);
    assert_eq!(items[0]["id"], 1);
    assert_eq!(items[49]["id"], 50);
    // mean of 1001..=1060 is 1030.5, ties go to even
    assert_eq!(body["averageSalary"], 1030);
    Ok(())
}

#[tokio::test]
async fn missing_department_is_bad_request() -> Result<()> {
    let (_lake, state) = lake_with("employees.csv", FakeFile::csv(common::employees_csv(&[]))).await?;

    let res = common::get_path(state.clone(), "/employees").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()?["message"], "Department parameter is required");

    let res = common::get_path(state, "/employees?department=%20%20").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn missing_file_url_is_server_error() -> Result<()> {
    let state = common::state(common::config_with_file(None), common::static_credential());
    let res = common::get_path(state, "/employees?department=IT").await?;

    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = res.json()?;
    assert!(!body["message"].as_str().unwrap_or_default().contains("ONELAKE"));
    Ok(())
}

#[tokio::test]
async fn unreachable_file_is_not_found() -> Result<()> {
    let lake = FakeLake::start(vec![
        ("forbidden.csv", FakeFile::status(StatusCode::FORBIDDEN)),
        ("broken.csv", FakeFile::status(StatusCode::SERVICE_UNAVAILABLE)),
    ])
    .await?;

    for name in ["missing.csv", "forbidden.csv", "broken.csv"] {
        let config = common::config_with_file(Some(lake.file_url(name)));
        let state = common::state(config, common::static_credential());
        let res = common::get_path(state, "/employees?department=IT").await?;
        assert_eq!(res.status, StatusCode::NOT_FOUND, "{name}");
        assert_eq!(res.json()?["message"], "CSV file not found or inaccessible");
    }
    Ok(())
}

#[tokio::test]
async fn malformed_csv_is_server_error() -> Result<()> {
    let csv = "Id,Name,Age,Department,Salary\n1,Ada,old,IT,100\n";
    let (_lake, state) = lake_with("employees.csv", FakeFile::csv(csv)).await?;

    let res = common::get_path(state, "/employees?department=IT").await?;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}

#[tokio::test]
async fn authentication_failure_is_server_error() -> Result<()> {
    let lake = FakeLake::start(vec![("employees.csv", FakeFile::csv(common::employees_csv(&[])))]).await?;
    let config = common::config_with_file(Some(lake.file_url("employees.csv")));
    let state = common::state(config, common::failing_credential());

    let res = common::get_path(state, "/employees?department=IT").await?;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}

#[tokio::test]
async fn sas_url_needs_no_credential() -> Result<()> {
    let csv = common::employees_csv(&[(1, "Ada", "IT", 100)]);
    let lake = FakeLake::start(vec![("sas-employees.csv", FakeFile::csv(csv))]).await?;
    let url = format!("{}?sv=2022-11-02&sig=abc", lake.file_url("sas-employees.csv"));
    let state = common::state(common::config_with_file(Some(url)), common::failing_credential());

    let res = common::get_path(state, "/employees?department=it").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()?["total"], 1);
    Ok(())
}

#[tokio::test]
async fn salary_overflow_is_server_error() -> Result<()> {
    let csv = "Id,Name,Age,Department,Salary\n\
               1,Ada,30,IT,79228162514264337593543950335\n\
               2,Grace,31,it,1\n";
    let (_lake, state) = lake_with("employees.csv", FakeFile::csv(csv)).await?;

    let res = common::get_path(state, "/employees?department=IT").await?;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = res.json()?;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "INTERNAL_SERVER_ERROR");
    Ok(())
}

#[tokio::test]
async fn average_beyond_integer_range_is_server_error() -> Result<()> {
    let csv = "Id,Name,Age,Department,Salary\n1,Ada,30,IT,100000000000000000000\n";
    let (_lake, state) = lake_with("employees.csv", FakeFile::csv(csv)).await?;

    let res = common::get_path(state, "/employees?department=IT").await?;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = res.json()?;
    assert_eq!(body["code"], "INTERNAL_SERVER_ERROR");
    assert!(body.get("averageSalary").is_none());
    Ok(())
}

#[tokio::test]
async fn eighty_matches_still_return_fifty_items() -> Result<()> {
    let rows: Vec<(i64, String)> = (1..=80).map(|i| (i, format!("E{i}"))).collect();
    let rows: Vec<(i64, &str, &str, i64)> =
        rows.iter().map(|(i, n)| (*i, n.as_str(), "Ops", 500)).collect();
    let (_lake, state) = lake_with("employees.csv", FakeFile::csv(common::employees_csv(&rows))).await?;

    let body = common::get_path(state, "/employees?department=ops").await?.json()?;
    assert_eq!(body["total"], 80);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(50));
    assert_eq!(body["averageSalary"], 500);
    Ok(())
}

#[tokio::test]
async fn repeated_department_is_json_bad_request() -> Result<()> {
    let (_lake, state) = lake_with("employees.csv", FakeFile::csv(common::employees_csv(&[]))).await?;

    let res = common::get_path(state, "/employees?department=a&department=b").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let body = res.json()?;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "BAD_REQUEST");
    Ok(())
}
