//! NSE institutional activity provider.
//!
//! The NSE site serves the daily FII/DII cash-market summary as JSON. It
//! rejects requests without browser-like headers.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use super::http::{build_client, check_status};
use super::provider::{FlowProvider, ProviderError};
use crate::domain::{FiiDiiActivity, FlowOrigin};

const DATE_FORMAT: &str = "%d-%b-%Y";

#[derive(Debug, Deserialize)]
struct FlowRow {
    category: String,
    date: String,
    #[serde(default, rename = "buyValue", deserialize_with = "amount")]
    buy_value: Option<f64>,
    #[serde(default, rename = "sellValue", deserialize_with = "amount")]
    sell_value: Option<f64>,
    #[serde(default, rename = "netValue", deserialize_with = "amount")]
    net_value: Option<f64>,
}

/// NSE sends amounts as numbers or as strings with thousands separators.
fn amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Num(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().replace(',', "").parse::<f64>().ok(),
        None => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Investor {
    Foreign,
    Domestic,
}

impl Investor {
    fn classify(category: &str) -> Option<Self> {
        let c = category.trim().to_ascii_uppercase();
        if c.starts_with("FII") || c.starts_with("FPI") {
            Some(Investor::Foreign)
        } else if c.starts_with("DII") {
            Some(Investor::Domestic)
        } else {
            None
        }
    }
}

pub struct NseFlowProvider {
    client: reqwest::blocking::Client,
    url: String,
}

impl NseFlowProvider {
    pub const DEFAULT_URL: &'static str = "https://www.nseindia.com/api/fiidiiTradeReact";

    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: Self::DEFAULT_URL.to_string(),
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn parse_rows(rows: Vec<FlowRow>) -> Result<FiiDiiActivity, ProviderError> {
        let mut fii: Option<(NaiveDate, &FlowRow)> = None;
        let mut dii: Option<(NaiveDate, &FlowRow)> = None;

        for row in &rows {
            let Some(investor) = Investor::classify(&row.category) else {
                continue;
            };
            let date = NaiveDate::parse_from_str(row.date.trim(), DATE_FORMAT).map_err(|_| {
                ProviderError::ResponseFormatChanged(format!("unrecognised date {:?}", row.date))
            })?;
            let slot = match investor {
                Investor::Foreign => &mut fii,
                Investor::Domestic => &mut dii,
            };
            // Keep the most recent row per investor class
            if slot.map_or(true, |(d, _)| date > d) {
                *slot = Some((date, row));
            }
        }

        let (fii_date, fii_row) = fii.ok_or_else(|| {
            ProviderError::ResponseFormatChanged("no FII/FPI row in response".into())
        })?;
        let (dii_date, dii_row) = dii.ok_or_else(|| {
            ProviderError::ResponseFormatChanged("no DII row in response".into())
        })?;

        let net = |row: &FlowRow| {
            row.net_value
                .or_else(|| Some(row.buy_value? - row.sell_value?))
                .ok_or_else(|| {
                    ProviderError::ResponseFormatChanged(format!(
                        "no net value for {}",
                        row.category.trim()
                    ))
                })
        };

        Ok(FiiDiiActivity {
            as_of: fii_date.max(dii_date),
            fii_net: net(fii_row)?,
            dii_net: net(dii_row)?,
            fii_buy: fii_row.buy_value,
            fii_sell: fii_row.sell_value,
            dii_buy: dii_row.buy_value,
            dii_sell: dii_row.sell_value,
            origin: FlowOrigin::Live,
        })
    }
}

impl FlowProvider for NseFlowProvider {
    fn name(&self) -> &str {
        "nse"
    }

    fn fetch_activity(&self) -> Result<FiiDiiActivity, ProviderError> {
        log::debug!("nse: GET FII/DII activity");
        let resp = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
            .header(reqwest::header::REFERER, "https://www.nseindia.com/")
            .send()?;
        let resp = check_status(resp, "fiidiiTradeReact")?;
        let rows: Vec<FlowRow> = resp.json().map_err(|e| {
            ProviderError::ResponseFormatChanged(format!(
                "failed to parse FII/DII response: {}",
                e.without_url()
            ))
        })?;
        Self::parse_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<FiiDiiActivity, ProviderError> {
        let rows: Vec<FlowRow> = serde_json::from_str(json).unwrap();
        NseFlowProvider::parse_rows(rows)
    }

    #[test]
    fn parses_string_and_number_amounts() {
        let json = r#"[
            {"category":"DII **","date":"15-Oct-2024","buyValue":"14,190.31","sellValue":"11,108.35","netValue":"3,081.96"},
            {"category":"FII/FPI *","date":"15-Oct-2024","buyValue":12040.5,"sellValue":13789.22,"netValue":-1748.72}
        ]"#;
        let a = parse(json).unwrap();
        assert_eq!(a.as_of, NaiveDate::from_ymd_opt(2024, 10, 15).unwrap());
        assert_eq!(a.fii_net, -1748.72);
        assert_eq!(a.dii_net, 3081.96);
        assert_eq!(a.dii_buy, Some(14190.31));
        assert_eq!(a.origin, FlowOrigin::Live);
    }

    #[test]
    fn net_falls_back_to_buy_minus_sell() {
        let json = r#"[
            {"category":"FII/FPI *","date":"15-Oct-2024","buyValue":100,"sellValue":60},
            {"category":"DII **","date":"15-Oct-2024","buyValue":10,"sellValue":30,"netValue":null}
        ]"#;
        let a = parse(json).unwrap();
        assert_eq!(a.fii_net, 40.0);
        assert_eq!(a.dii_net, -20.0);
    }

    #[test]
    fn keeps_latest_row_per_class() {
        let json = r#"[
            {"category":"FII/FPI *","date":"14-Oct-2024","netValue":1},
            {"category":"FII/FPI *","date":"15-Oct-2024","netValue":2},
            {"category":"DII **","date":"15-Oct-2024","netValue":3}
        ]"#;
        assert_eq!(parse(json).unwrap().fii_net, 2.0);
    }

    #[test]
    fn missing_dii_row_is_format_change() {
        let json = r#"[{"category":"FII/FPI *","date":"15-Oct-2024","netValue":1}]"#;
        assert!(matches!(
            parse(json),
            Err(ProviderError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn bad_date_is_format_change() {
        let json = r#"[
            {"category":"FII/FPI *","date":"2024-10-15","netValue":1},
            {"category":"DII **","date":"15-Oct-2024","netValue":3}
        ]"#;
        assert!(parse(json).unwrap_err().to_string().contains("2024-10-15"));
    }
}
