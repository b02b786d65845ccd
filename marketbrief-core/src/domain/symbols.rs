//! Ticker normalization and display names.

/// Exchange suffixes stripped for display (`RELIANCE.NS` -> `RELIANCE`).
const EXCHANGE_SUFFIXES: [&str; 2] = [".NS", ".BO"];

const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("^NSEI", "NIFTY 50"),
    ("^NSEBANK", "NIFTY Bank"),
    ("^CNXIT", "NIFTY IT"),
    ("^CNXFMCG", "NIFTY FMCG"),
    ("^CNXPHARMA", "NIFTY Pharma"),
    ("^CNXENERGY", "NIFTY Energy"),
    ("^CNXMETAL", "NIFTY Metal"),
    ("^CNXAUTO", "NIFTY Auto"),
    ("^CNXREALTY", "NIFTY Realty"),
    ("^CNXINFRA", "NIFTY Infra"),
    ("^CNXMEDIA", "NIFTY Media"),
    ("^CNXPSUBANK", "NIFTY PSU Bank"),
    ("^INDIAVIX", "India VIX"),
    ("^GSPC", "S&P 500"),
    ("^DJI", "Dow Jones"),
    ("^IXIC", "NASDAQ"),
    ("^FTSE", "FTSE 100"),
    ("^N225", "Nikkei 225"),
    ("^HSI", "Hang Seng"),
    ("GC=F", "Gold"),
    ("SI=F", "Silver"),
    ("CL=F", "Crude Oil"),
    ("NG=F", "Natural Gas"),
    ("USDINR=X", "USD/INR"),
    ("EURINR=X", "EUR/INR"),
    ("GBPINR=X", "GBP/INR"),
    ("JPYINR=X", "JPY/INR"),
    ("BTC-USD", "Bitcoin"),
    ("ETH-USD", "Ethereum"),
    ("USDT-USD", "Tether"),
    ("BNB-USD", "BNB"),
    ("XRP-USD", "XRP"),
];

/// Known display name for a provider symbol.
pub fn display_name(symbol: &str) -> Option<&'static str> {
    DISPLAY_NAMES
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, name)| *name)
}

/// Normalize a provider symbol for display: trim whitespace, uppercase,
/// strip the exchange suffix.
pub fn display_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    for suffix in EXCHANGE_SUFFIXES {
        if let Some(stripped) = upper.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    upper
}
