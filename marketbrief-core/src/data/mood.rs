//! Market Mood Index derived from a volatility index.

use super::provider::{FetchWindow, MoodProvider, ProviderError, QuoteProvider};
use crate::domain::{mmi_from_vix, MoodReading};

/// Reads the latest volatility-index closes through a [`QuoteProvider`] and
/// maps them onto the 0..=100 mood scale.
pub struct VixMoodProvider<'a> {
    quotes: &'a dyn QuoteProvider,
    vix_symbol: String,
}

impl<'a> VixMoodProvider<'a> {
    pub fn new(quotes: &'a dyn QuoteProvider, vix_symbol: impl Into<String>) -> Self {
        Self {
            quotes,
            vix_symbol: vix_symbol.into(),
        }
    }
}

impl MoodProvider for VixMoodProvider<'_> {
    fn name(&self) -> &str {
        "vix_mood"
    }

    fn fetch_mood(&self, window: FetchWindow) -> Result<MoodReading, ProviderError> {
        let closes = self.quotes.fetch_closes(&self.vix_symbol, window)?;
        let [.., prev, last] = closes.as_slice() else {
            return Err(ProviderError::InsufficientData {
                symbol: self.vix_symbol.clone(),
                points: closes.len(),
            });
        };
        Ok(MoodReading {
            value: mmi_from_vix(last.close),
            source_symbol: self.vix_symbol.clone(),
            vix_close: last.close,
            vix_prev_close: prev.close,
            as_of: last.date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ClosePoint;
    use chrono::NaiveDate;

    struct FixedQuotes(Vec<ClosePoint>);

    impl QuoteProvider for FixedQuotes {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch_closes(
            &self,
            _symbol: &str,
            _window: FetchWindow,
        ) -> Result<Vec<ClosePoint>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
    }

    #[test]
    fn maps_latest_vix_close() {
        let quotes = FixedQuotes(vec![
            ClosePoint { date: d(15), close: 13.1 },
            ClosePoint { date: d(16), close: 14.2 },
        ]);
        let mood = VixMoodProvider::new(&quotes, "^INDIAVIX");
        let r = mood.fetch_mood(FetchWindow::ending_on(d(16), 5)).unwrap();
        assert_eq!(r.value, 70.0);
        assert_eq!(r.vix_prev_close, 13.1);
        assert_eq!(r.as_of, d(16));
    }

    #[test]
    fn single_close_is_insufficient() {
        let quotes = FixedQuotes(vec![ClosePoint { date: d(16), close: 14.2 }]);
        let mood = VixMoodProvider::new(&quotes, "^INDIAVIX");
        let err = mood.fetch_mood(FetchWindow::ending_on(d(16), 5)).unwrap_err();
        assert!(matches!(err, ProviderError::InsufficientData { points: 1, .. }));
    }
}
