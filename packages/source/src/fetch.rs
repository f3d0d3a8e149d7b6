//! Month-by-month paginated fetching of raw transaction records.
//!
//! The transaction APIs answer one `(area code, deal month)` pair per
//! request, paginated. A lookback window therefore becomes one job per
//! month; jobs run concurrently up to the source's `concurrency`, and the
//! pages inside a month are fetched sequentially once the first page has
//! reported the month's total count.

use std::sync::Arc;
use std::time::Duration;

use estate_map_transaction_models::{TransactionRecord, YearMonth};
use futures::stream::{self, StreamExt as _, TryStreamExt as _};
use serde_json::Value;

use crate::parsing::{parse_integer, parse_text, value_at_path};
use crate::progress::ProgressCallback;
use crate::retry;
use crate::source_def::{FetcherConfig, SourceDefinition, normalize_records};
use crate::{FetchOptions, SourceError};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Returns `months` deal months ending at `reference`, newest first.
#[must_use]
pub fn lookback_months(reference: YearMonth, months: usize) -> Vec<YearMonth> {
    std::iter::successors(Some(reference), |month| Some(month.add_months(-1)))
        .take(months)
        .collect()
}

/// Formats a deal month the way the APIs expect it (`YYYYMM`).
#[must_use]
pub fn month_param_value(month: YearMonth) -> String {
    format!("{}{:02}", month.year(), month.month())
}

/// Number of pages needed for `total` records.
#[must_use]
pub const fn page_count(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Pulls the records out of a response body.
///
/// The APIs return an array for multiple records, a bare object for a
/// single record, and an empty string or nothing for an empty month.
#[must_use]
pub fn extract_records(body: &Value, records_path: &str) -> Vec<Value> {
    match value_at_path(body, records_path) {
        Some(Value::Array(items)) => items.clone(),
        Some(item @ Value::Object(_)) => vec![item.clone()],
        _ => Vec::new(),
    }
}

/// Reads the month's total record count from a response body. Missing
/// counts are treated as zero, which limits the month to its first page.
#[must_use]
pub fn total_count(body: &Value, config: &FetcherConfig) -> u64 {
    value_at_path(body, &config.total_count_path)
        .and_then(parse_integer)
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(0)
}

/// Fails if the body carries a result code outside `success_codes`.
///
/// # Errors
///
/// Returns [`SourceError::Api`] with the reported code and message.
pub fn check_result_code(body: &Value, config: &FetcherConfig) -> Result<(), SourceError> {
    let Some(path) = &config.result_code_path else {
        return Ok(());
    };
    let Some(code) = value_at_path(body, path).and_then(parse_text) else {
        return Ok(());
    };
    if config.success_codes.is_empty() || config.success_codes.contains(&code) {
        return Ok(());
    }

    let message = config
        .result_message_path
        .as_deref()
        .and_then(|path| value_at_path(body, path))
        .and_then(parse_text)
        .unwrap_or_default();

    Err(SourceError::Api { code, message })
}

/// Builds the query string for one page request.
#[must_use]
pub fn request_params(
    config: &FetcherConfig,
    service_key: &str,
    area_code: &str,
    month: YearMonth,
    page: u64,
) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = config
        .extra_params
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    params.push((config.service_key_param.clone(), service_key.to_string()));
    params.push((config.area_param.clone(), area_code.to_string()));
    params.push((config.month_param.clone(), month_param_value(month)));
    params.push((config.page_param.clone(), page.to_string()));
    params.push((config.size_param.clone(), config.page_size.to_string()));
    params
}

/// Reads the service key from the environment variable named by the
/// source.
///
/// # Errors
///
/// Returns [`SourceError::Config`] if the variable is unset or empty.
pub fn service_key(config: &FetcherConfig) -> Result<String, SourceError> {
    std::env::var(&config.service_key_env)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| SourceError::Config {
            message: format!(
                "{} is not set; export the API service key to fetch transactions",
                config.service_key_env
            ),
        })
}

async fn fetch_page(
    client: &reqwest::Client,
    config: &FetcherConfig,
    params: &[(String, String)],
) -> Result<Value, SourceError> {
    let body = retry::send_json(|| client.get(&config.api_url).query(params)).await?;
    check_result_code(&body, config)?;
    Ok(body)
}

/// Fetches every page of one deal month.
async fn fetch_month(
    client: &reqwest::Client,
    source: &SourceDefinition,
    service_key: &str,
    area_code: &str,
    month: YearMonth,
) -> Result<Vec<Value>, SourceError> {
    let config = &source.fetcher;

    let first = fetch_page(
        client,
        config,
        &request_params(config, service_key, area_code, month, 1),
    )
    .await?;
    let total = total_count(&first, config);
    let pages = page_count(total, config.page_size);
    let mut records = extract_records(&first, &config.records_path);

    for page in 2..=pages {
        let body = fetch_page(
            client,
            config,
            &request_params(config, service_key, area_code, month, page),
        )
        .await?;
        records.extend(extract_records(&body, &config.records_path));
    }

    if (records.len() as u64) < total {
        log::warn!(
            "[{}] {area_code} {month}: expected {total} records, received {}",
            source.id,
            records.len()
        );
    }

    log::debug!(
        "[{}] {area_code} {month}: {} records over {} page(s)",
        source.id,
        records.len(),
        pages.max(1)
    );

    Ok(records)
}

/// Fetches and normalizes all transactions for `options.area_code` over the
/// lookback window.
///
/// Months are fetched concurrently; any month that still fails after
/// retries fails the whole fetch, since a partial window would skew the
/// trend series.
///
/// # Errors
///
/// Returns [`SourceError`] if the service key is missing, a request fails
/// after all retries, or the API reports an error code.
pub async fn fetch_transactions(
    source: &SourceDefinition,
    options: &FetchOptions,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Vec<TransactionRecord>, SourceError> {
    let service_key = service_key(&source.fetcher)?;
    let client = reqwest::Client::builder()
        .user_agent("estate-map/1.0")
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    let months = lookback_months(options.reference, options.months);
    progress.set_total(months.len() as u64);
    progress.set_message(format!("Fetching {} ({})", source.name, options.area_code));

    log::info!(
        "[{}] Fetching {} months of deals for area {} ending {} (concurrency={})",
        source.id,
        months.len(),
        options.area_code,
        options.reference,
        source.fetcher.concurrency
    );

    let per_month: Vec<Vec<Value>> = stream::iter(months.into_iter().map(|month| {
        let client = &client;
        let service_key = service_key.as_str();
        async move {
            let records =
                fetch_month(client, source, service_key, &options.area_code, month).await;
            progress.inc(1);
            records
        }
    }))
    .buffered(source.fetcher.concurrency.max(1))
    .try_collect()
    .await?;

    let raw: Vec<Value> = per_month.into_iter().flatten().collect();
    let records = normalize_records(&raw, &source.fields);

    log::info!(
        "[{}] {} raw records, {} normalized",
        source.id,
        raw.len(),
        records.len()
    );
    progress.finish(format!("{} transactions", records.len()));

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::registry::{DEFAULT_SOURCE_ID, find_source};

    fn config() -> FetcherConfig {
        find_source(DEFAULT_SOURCE_ID).unwrap().fetcher
    }

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn lookback_is_newest_first_across_years() {
        let months = lookback_months(ym(2024, 2), 4);
        assert_eq!(
            months,
            [ym(2024, 2), ym(2024, 1), ym(2023, 12), ym(2023, 11)]
        );
        assert_eq!(lookback_months(ym(2024, 2), 36).len(), 36);
        assert!(lookback_months(ym(2024, 2), 0).is_empty());
    }

    #[test]
    fn formats_deal_month() {
        assert_eq!(month_param_value(ym(2024, 3)), "202403");
        assert_eq!(month_param_value(ym(2023, 12)), "202312");
    }

    #[test]
    fn counts_pages() {
        assert_eq!(page_count(0, 1000), 0);
        assert_eq!(page_count(1, 1000), 1);
        assert_eq!(page_count(1000, 1000), 1);
        assert_eq!(page_count(1001, 1000), 2);
        assert_eq!(page_count(5, 0), 0);
    }

    #[test]
    fn extracts_array_single_and_empty_records() {
        let path = "response.body.items.item";
        let many = json!({"response": {"body": {"items": {"item": [{"aptNm": "A"}, {"aptNm": "B"}]}}}});
        let one = json!({"response": {"body": {"items": {"item": {"aptNm": "A"}}}}});
        let empty = json!({"response": {"body": {"items": ""}}});

        assert_eq!(extract_records(&many, path).len(), 2);
        assert_eq!(extract_records(&one, path), vec![json!({"aptNm": "A"})]);
        assert!(extract_records(&empty, path).is_empty());
    }

    #[test]
    fn reads_total_count_as_number_or_string() {
        let config = config();
        let numeric = json!({"response": {"body": {"totalCount": 2345}}});
        let text = json!({"response": {"body": {"totalCount": "17"}}});
        assert_eq!(total_count(&numeric, &config), 2345);
        assert_eq!(total_count(&text, &config), 17);
        assert_eq!(total_count(&json!({}), &config), 0);
    }

    #[test]
    fn checks_result_code() {
        let config = config();
        let ok = json!({"response": {"header": {"resultCode": "000", "resultMsg": "OK"}}});
        let missing = json!({"response": {"body": {}}});
        let bad = json!({"response": {"header": {"resultCode": "30", "resultMsg": "SERVICE KEY IS NOT REGISTERED"}}});

        assert!(check_result_code(&ok, &config).is_ok());
        assert!(check_result_code(&missing, &config).is_ok());
        match check_result_code(&bad, &config) {
            Err(SourceError::Api { code, message }) => {
                assert_eq!(code, "30");
                assert_eq!(message, "SERVICE KEY IS NOT REGISTERED");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[test]
    fn builds_request_params() {
        let config = config();
        let params = request_params(&config, "secret", "11680", ym(2024, 5), 3);
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("serviceKey"), Some("secret"));
        assert_eq!(get("LAWD_CD"), Some("11680"));
        assert_eq!(get("DEAL_YMD"), Some("202405"));
        assert_eq!(get("pageNo"), Some("3"));
        assert_eq!(get("numOfRows"), Some("1000"));
        assert_eq!(get("_type"), Some("json"));
    }

    #[test]
    fn missing_service_key_is_a_config_error() {
        let mut config = config();
        config.service_key_env = "ESTATE_MAP_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        assert!(matches!(
            service_key(&config),
            Err(SourceError::Config { .. })
        ));
    }
}
