use crate::arbitrage::cooldown::CooldownKey;
use crate::utils::TokenPair;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A cross-venue price gap that clears fees, slippage and the threshold.
/// Percentages are in percent units (1.0 == 1%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub pair: TokenPair,
    pub buy_venue: String,
    pub sell_venue: String,
    pub buy_price: f64,
    pub sell_price: f64,
    pub price_diff_pct: f64,
    pub fees_pct: f64,
    pub slippage_pct: f64,
    pub net_profit_pct: f64,
    pub detected_at: i64,
}

impl ArbitrageOpportunity {
    pub fn cooldown_key(&self) -> CooldownKey {
        CooldownKey::new(&self.buy_venue, &self.sell_venue, &self.pair)
    }

    /// Slack mrkdwn alert text.
    pub fn format_message(&self) -> String {
        let detected = Utc
            .timestamp_opt(self.detected_at, 0)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| self.detected_at.to_string());
        format!(
            ":rotating_light: *Arbitrage opportunity detected*\n\
             *Pair:* {}\n\
             *Buy on:* {} at {:.8}\n\
             *Sell on:* {} at {:.8}\n\
             *Price difference:* {:.2}%\n\
             *Fees:* {:.2}%\n\
             *Slippage tolerance:* {:.2}%\n\
             *Net profit:* {:.2}%\n\
             *Detected at:* {}",
            self.pair,
            self.buy_venue,
            self.buy_price,
            self.sell_venue,
            self.sell_price,
            self.price_diff_pct,
            self.fees_pct,
            self.slippage_pct,
            self.net_profit_pct,
            detected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_contains_trade_details() {
        let opp = ArbitrageOpportunity {
            pair: TokenPair::new("WETH", "USDT"),
            buy_venue: "sushiswap".into(),
            sell_venue: "binance".into(),
            buy_price: 2450.123456789,
            sell_price: 2500.0,
            price_diff_pct: 2.0358,
            fees_pct: 0.4,
            slippage_pct: 0.3,
            net_profit_pct: 1.3358,
            detected_at: 1_700_000_000,
        };
        let message = opp.format_message();
        assert!(message.contains("*Pair:* WETH/USDT"));
        assert!(message.contains("*Buy on:* sushiswap at 2450.12345679"));
        assert!(message.contains("*Sell on:* binance at 2500.00000000"));
        assert!(message.contains("*Net profit:* 1.34%"));
        assert!(message.contains("2023-11-14 22:13:20 UTC"));
    }
}
