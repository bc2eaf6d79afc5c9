use assert_cmd::prelude::*;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::process::Command;

fn wbi() -> Command {
    let mut cmd = Command::cargo_bin("wbi-report").unwrap();
    cmd.env_remove("WORLD_BANK_API_KEY")
        .env_remove("OLLAMA_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("OLLAMA_MODEL");
    cmd
}

fn population_page() -> serde_json::Value {
    json!([
        {"page": 1, "pages": 1, "per_page": 2, "total": 2},
        [
            {
                "indicator": {"id": "SP.POP.TOTL", "value": "Population, total"},
                "country": {"id": "DE", "value": "Germany"},
                "countryiso3code": "DEU",
                "date": "2021",
                "value": 83196078
            },
            {
                "indicator": {"id": "SP.POP.TOTL", "value": "Population, total"},
                "country": {"id": "DE", "value": "Germany"},
                "countryiso3code": "DEU",
                "date": "2020",
                "value": 83160871
            }
        ]
    ])
}

#[test]
fn cli_shows_help() {
    wbi()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("wbi-report"));
}

#[test]
fn check_accepts_valid_query() {
    wbi()
        .args(["check", "-c", "usa;fra", "-i", "NY.GDP.PCAP.CD", "-d", "2015:2017"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FRA;USA|NY.GDP.PCAP.CD|2015:2017"));
}

#[test]
fn check_rejects_reversed_years() {
    wbi()
        .args(["check", "-c", "USA", "-i", "SP.POP.TOTL", "-d", "2020:2010"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid query"));
}

#[test]
fn get_prints_rows_and_stats_from_source() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/country/USA/indicator/SP.POP.TOTL");
        then.status(200).json_body(json!([
            {"page": 1, "pages": 1, "per_page": "1000", "total": 2},
            [
                {
                    "indicator": {"id": "SP.POP.TOTL", "value": "Population, total"},
                    "country": {"id": "US", "value": "United States"},
                    "countryiso3code": "USA",
                    "date": "2020",
                    "value": 331511512
                },
                {
                    "indicator": {"id": "SP.POP.TOTL", "value": "Population, total"},
                    "country": {"id": "US", "value": "United States"},
                    "countryiso3code": "USA",
                    "date": "2019",
                    "value": null
                }
            ]
        ]));
    });

    wbi()
        .args([
            "get",
            "-c",
            "USA",
            "-i",
            "SP.POP.TOTL",
            "-d",
            "2019:2020",
            "--stats",
            "--base-url",
        ])
        .arg(server.base_url())
        .assert()
        .success()
        .stdout(predicate::str::contains("331511512"))
        .stdout(predicate::str::contains("count=1 missing=1"));
    mock.assert();
}

#[test]
fn get_reports_source_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET);
        then.status(500).body("down for maintenance");
    });

    wbi()
        .args(["get", "-c", "USA", "-i", "SP.POP.TOTL", "--base-url"])
        .arg(server.base_url())
        .assert()
        .failure()
        .stderr(predicate::str::contains("down for maintenance"));
}

#[test]
fn get_forwards_per_page_and_api_key() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/country/DEU/indicator/SP.POP.TOTL")
            .query_param("per_page", "2")
            .query_param("api_key", "from-flag");
        then.status(200).json_body(population_page());
    });

    wbi()
        .env("WORLD_BANK_API_KEY", "from-env")
        .args([
            "get", "-c", "DEU", "-i", "SP.POP.TOTL", "-d", "2020:2021",
            "--per-page", "2", "--api-key", "from-flag", "--base-url",
        ])
        .arg(server.base_url())
        .assert()
        .success()
        .stdout(predicate::str::contains("83196078"));
    mock.assert();
}

#[test]
fn get_report_prints_local_model_answer() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/country/DEU/indicator/SP.POP.TOTL");
        then.status(200).json_body(population_page());
    });
    let generate = server.mock(|when, then| {
        when.method(POST)
            .path("/api/generate")
            .body_includes("Germany: n=2 years");
        then.status(200).json_body(json!({
            "model": "gemma3:latest",
            "response": "Germany grew slightly.",
            "done": true
        }));
    });

    wbi()
        .env("OLLAMA_HOST", server.base_url())
        .args(["get", "-c", "DEU", "-i", "SP.POP.TOTL", "-d", "2020:2021", "--report"])
        .args(["--base-url", &server.base_url()])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ollama-local]\nGermany grew slightly."));
    generate.assert();
}

#[test]
fn get_report_failure_keeps_the_table() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/country/DEU/indicator/SP.POP.TOTL");
        then.status(200).json_body(population_page());
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/generate");
        then.status(500).body("model not loaded");
    });

    wbi()
        .env("OLLAMA_HOST", server.base_url())
        .args(["get", "-c", "DEU", "-i", "SP.POP.TOTL", "-d", "2020:2021", "--report"])
        .args(["--base-url", &server.base_url()])
        .assert()
        .success()
        .stdout(predicate::str::contains("83160871"))
        .stderr(predicate::str::contains("AI report failed"))
        .stderr(predicate::str::contains("ollama-local"));
}
