use std::time::Duration;

/// Tunables shared by the store, the action executor and the edit session.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Number of undo snapshots kept (default: 50)
    pub history_capacity: usize,
    /// Upper bound on a single call to the generator (default: 60s)
    pub service_timeout: Duration,
    /// `id` of the element holding the pricing cards (default: "pricing-cards")
    pub container_id: String,
    /// Class marking a pricing card (default: "pricing-card")
    pub plan_class: String,
    /// Price text shown for free plans (default: "FREE")
    pub free_label: String,
    /// Currency symbol prefixed to numeric prices (default: "$")
    pub currency_symbol: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: 50,
            service_timeout: Duration::from_secs(60),
            container_id: "pricing-cards".to_string(),
            plan_class: "pricing-card".to_string(),
            free_label: "FREE".to_string(),
            currency_symbol: "$".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` undo snapshots. Zero disables history.
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_service_timeout(mut self, timeout: Duration) -> Self {
        self.service_timeout = timeout;
        self
    }

    pub fn with_container_id(mut self, id: impl Into<String>) -> Self {
        self.container_id = id.into();
        self
    }

    pub fn with_plan_class(mut self, class: impl Into<String>) -> Self {
        self.plan_class = class.into();
        self
    }

    pub fn with_free_label(mut self, label: impl Into<String>) -> Self {
        self.free_label = label.into();
        self
    }

    pub fn with_currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    /// Display text for a price: the symbol is added unless already present.
    pub fn format_price(&self, amount: &str) -> String {
        let amount = amount.trim();
        if amount.is_empty() {
            format!("{}0", self.currency_symbol)
        } else if amount.starts_with(self.currency_symbol.as_str()) {
            amount.to_string()
        } else {
            format!("{}{}", self.currency_symbol, amount)
        }
    }
}
