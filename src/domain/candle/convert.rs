use super::wire::RawCandle;
use super::Bar;

impl From<RawCandle> for Bar {
    fn from(raw: RawCandle) -> Self {
        Self {
            time: raw.started_at,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.base_token_volume.ceil(),
        }
    }
}

impl From<&RawCandle> for Bar {
    fn from(raw: &RawCandle) -> Self {
        raw.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::CandleResolution;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn raw() -> RawCandle {
        serde_json::from_str(
            r#"{
                "startedAt": "2024-01-01T00:01:00.000Z",
                "ticker": "BTC-USD",
                "resolution": "1MIN",
                "low": "42000.5",
                "high": "42100",
                "open": "42010",
                "close": "42090.25",
                "baseTokenVolume": "3.2",
                "usdVolume": "134400",
                "trades": 17
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_wire_parses_all_fields() {
        let c = raw();
        assert_eq!(c.started_at, 1_704_067_260_000);
        assert_eq!(c.resolution, Some(CandleResolution::Minute1));
        assert_eq!(c.ticker.as_ref().map(|t| t.as_str()), Some("BTC-USD"));
        assert_eq!(c.trades, Some(17));
    }

    #[test]
    fn test_bar_from_raw_candle() {
        let bar = Bar::from(raw());
        assert_eq!(bar.time, 1_704_067_260_000);
        assert_eq!(bar.open, Decimal::from(42010));
        assert_eq!(bar.high, Decimal::from(42100));
        assert_eq!(bar.low, Decimal::from_str("42000.5").unwrap());
        assert_eq!(bar.close, Decimal::from_str("42090.25").unwrap());
        assert_eq!(bar.volume, Decimal::from(4));
    }

    #[test]
    fn test_optional_fields_may_be_absent() {
        let c: RawCandle = serde_json::from_str(
            r#"{"startedAt":"2024-01-01T00:00:00Z","open":"1","high":"2","low":"0.5","close":"1.5","baseTokenVolume":"10"}"#,
        )
        .unwrap();
        assert!(c.usd_volume.is_none());
        assert!(c.ticker.is_none());
        assert_eq!(Bar::from(&c).volume, Decimal::from(10));
    }
}
