//! Query API
//!
//! Flux queries are answered with [annotated CSV]: every table in the result
//! is introduced by `#datatype`, `#group` and `#default` annotation rows and a
//! header row, followed by its data rows.
//!
//! [annotated CSV]: https://docs.influxdata.com/influxdb/v2/reference/syntax/annotated-csv/

use crate::models::{FluxRecord, FluxValue, Query};
use crate::{
    AnnotatedCsvSnafu, Client, CsvSnafu, HttpSnafu, QueryFailedSnafu, RequestError,
    ReqwestProcessingSnafu, SerializingSnafu,
};
use bytes::Bytes;
use chrono::DateTime;
use reqwest::{
    Method, StatusCode,
    header::{ACCEPT, CONTENT_TYPE},
};
use snafu::ResultExt;

impl Client {
    /// Run a Flux query in the given organization and return the raw response
    /// body.
    pub async fn query_raw(&self, org: &str, query: &Query) -> Result<Bytes, RequestError> {
        let query_url = format!("{}/api/v2/query", self.url);
        let body = serde_json::to_string(query).context(SerializingSnafu)?;

        let response = self
            .request(Method::POST, &query_url)
            .query(&[("org", org)])
            .header(ACCEPT, "application/csv")
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .context(ReqwestProcessingSnafu)?;

        match response.status() {
            StatusCode::OK => Ok(response.bytes().await.context(ReqwestProcessingSnafu)?),
            status => {
                let text = response.text().await.context(ReqwestProcessingSnafu)?;
                HttpSnafu { status, text }.fail()?
            }
        }
    }

    /// Run a Flux query in the given organization and decode every record of
    /// every result table.
    pub async fn query(&self, org: &str, query: &Query) -> Result<Vec<FluxRecord>, RequestError> {
        let body = self.query_raw(org, query).await?;
        parse_annotated_csv(&body)
    }
}

#[derive(Debug, Default)]
struct Table {
    datatypes: Vec<String>,
    defaults: Vec<String>,
    columns: Option<Vec<String>>,
}

impl Table {
    fn is_error_table(&self) -> bool {
        matches!(
            self.columns.as_deref(),
            Some([error, reference]) if error == "error" && reference == "reference"
        )
    }
}

/// Decode an annotated CSV response into records.
pub fn parse_annotated_csv(body: &[u8]) -> Result<Vec<FluxRecord>, RequestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body);

    let mut records = vec![];
    let mut table = Table::default();

    for row in reader.records() {
        let row = row.context(CsvSnafu)?;
        let annotation = row.get(0).unwrap_or_default();

        if annotation.starts_with('#') {
            // annotations after a header start the next table
            if table.columns.is_some() {
                table = Table::default();
            }
            let cells = row.iter().skip(1).map(ToString::to_string).collect();
            match annotation {
                "#datatype" => table.datatypes = cells,
                "#default" => table.defaults = cells,
                "#group" => {}
                other => {
                    return AnnotatedCsvSnafu {
                        message: format!("unknown annotation `{other}`"),
                    }
                    .fail();
                }
            }
            continue;
        }

        let Some(columns) = &table.columns else {
            table.columns = Some(row.iter().skip(1).map(ToString::to_string).collect());
            continue;
        };

        if table.is_error_table() {
            let message = row.get(1).unwrap_or_default().to_string();
            let reference = row.get(2).filter(|r| !r.is_empty()).map(ToString::to_string);
            return QueryFailedSnafu { message, reference }.fail();
        }

        let mut record = FluxRecord::default();
        for (i, column) in columns.iter().enumerate() {
            let raw = row.get(i + 1).unwrap_or_default();
            let raw = if raw.is_empty() {
                table.defaults.get(i).map(String::as_str).unwrap_or_default()
            } else {
                raw
            };
            let datatype = table.datatypes.get(i).map(String::as_str).unwrap_or("string");

            let value = if raw.is_empty() && datatype != "string" {
                FluxValue::Null
            } else {
                parse_value(datatype, raw)?
            };

            if let ("table", FluxValue::Long(t)) = (column.as_str(), &value) {
                record.table = *t;
            }
            record.values.insert(column.clone(), value);
        }
        records.push(record);
    }

    Ok(records)
}

fn parse_value(datatype: &str, raw: &str) -> Result<FluxValue, RequestError> {
    let invalid = || {
        AnnotatedCsvSnafu {
            message: format!("invalid {datatype} value `{raw}`"),
        }
        .build()
    };

    let value = match datatype {
        "boolean" => match raw {
            "true" => FluxValue::Bool(true),
            "false" => FluxValue::Bool(false),
            _ => return Err(invalid()),
        },
        "long" => FluxValue::Long(raw.parse().map_err(|_| invalid())?),
        "unsignedLong" => FluxValue::UnsignedLong(raw.parse().map_err(|_| invalid())?),
        "double" => FluxValue::Double(raw.parse().map_err(|_| invalid())?),
        "dateTime:RFC3339" | "dateTime:RFC3339Nano" => {
            FluxValue::Time(DateTime::parse_from_rfc3339(raw).map_err(|_| invalid())?)
        }
        _ => FluxValue::String(raw.to_string()),
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use pretty_assertions::assert_eq;

    const TWO_TABLES: &str = "\
#datatype,string,long,dateTime:RFC3339,dateTime:RFC3339,dateTime:RFC3339,string,string,string,string\r
#group,false,false,true,true,false,false,true,true,true\r
#default,_result,,,,,,,,\r
,result,table,_start,_stop,_time,_value,_field,_measurement,series\r
,,0,2023-01-01T00:00:00Z,2023-01-01T01:00:00Z,2023-01-01T00:00:01Z,Something happened [0],log,stat0,series-0\r
,,0,2023-01-01T00:00:00Z,2023-01-01T01:00:00Z,2023-01-01T00:00:02Z,Something happened [1],log,stat0,series-0\r
\r
#datatype,string,long,dateTime:RFC3339,long,string,string\r
#group,false,false,false,false,true,true\r
#default,_result,,,,,\r
,result,table,_time,_value,_field,_measurement\r
,,1,2023-01-01T00:00:03Z,42,max,stat0\r
\r
";

    #[test]
    fn parses_multiple_tables() {
        let records = parse_annotated_csv(TWO_TABLES.as_bytes()).unwrap();

        assert_eq!(records.len(), 3);

        assert_eq!(records[0].table, 0);
        assert_eq!(records[0].measurement(), Some("stat0"));
        assert_eq!(records[0].field(), Some("log"));
        assert_eq!(
            records[0].value(),
            Some(&FluxValue::String("Something happened [0]".to_string()))
        );
        assert_eq!(
            records[0].values.get("result"),
            Some(&FluxValue::String("_result".to_string()))
        );
        assert_eq!(
            records[1].time(),
            Some(DateTime::parse_from_rfc3339("2023-01-01T00:00:02Z").unwrap())
        );

        assert_eq!(records[2].table, 1);
        assert_eq!(records[2].field(), Some("max"));
        assert_eq!(records[2].value(), Some(&FluxValue::Long(42)));
    }

    #[test]
    fn empty_response_has_no_records() {
        assert!(parse_annotated_csv(b"").unwrap().is_empty());
        assert!(parse_annotated_csv(b"\r\n").unwrap().is_empty());
    }

    #[test]
    fn error_table_is_a_query_failure() {
        let body = "\
#datatype,string,string\r
#group,true,true\r
#default,,\r
,error,reference\r
,failed to execute query: bucket not found,897\r
";
        let err = parse_annotated_csv(body.as_bytes()).unwrap_err();

        match err {
            RequestError::QueryFailed { message, reference } => {
                assert_eq!(message, "failed to execute query: bucket not found");
                assert_eq!(reference.as_deref(), Some("897"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_values_are_rejected() {
        let body = "\
#datatype,string,long,double\r
#group,false,false,false\r
#default,_result,,\r
,result,table,_value\r
,,0,not-a-number\r
";
        let err = parse_annotated_csv(body.as_bytes()).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Malformed annotated CSV response: invalid double value `not-a-number`"
        );
    }

    #[test]
    fn typed_values() {
        assert_eq!(parse_value("boolean", "true").unwrap(), FluxValue::Bool(true));
        assert_eq!(
            parse_value("unsignedLong", "7").unwrap(),
            FluxValue::UnsignedLong(7)
        );
        assert_eq!(parse_value("double", "1.5").unwrap(), FluxValue::Double(1.5));
        assert_eq!(
            parse_value("duration", "1h").unwrap(),
            FluxValue::String("1h".to_string())
        );
        assert!(parse_value("boolean", "yes").is_err());
    }

    #[tokio::test]
    async fn query_sends_flux_and_decodes_response() {
        let token = "some-token";
        let org = "some-org";
        let flux = r#"from(bucket: "data") |> range(start: -1h)"#;

        let mut mock_server = Server::new_async().await;
        let mock = mock_server
            .mock("POST", "/api/v2/query")
            .match_query(Matcher::UrlEncoded("org".into(), org.into()))
            .match_header("Authorization", format!("Token {token}").as_str())
            .match_header("Accept", "application/csv")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "query": flux,
                "type": "flux",
                "dialect": {
                    "header": true,
                    "annotations": ["datatype", "group", "default"],
                    "dateTimeFormat": "RFC3339Nano",
                },
            })))
            .with_header("Content-Type", "text/csv; charset=utf-8")
            .with_body(TWO_TABLES)
            .create_async()
            .await;

        let client = Client::new(mock_server.url(), token);

        let records = client.query(org, &Query::new(flux)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 3);
    }
}
