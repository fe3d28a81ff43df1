// View parameters requested by a widget
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    #[serde(default)]
    pub desc: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub column: String,
    pub op: String,
    pub value: serde_json::Value,
}

/// The exact server-side view a widget asks for. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewParams {
    pub table: String,
    pub page: u32,
    pub page_size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<FilterSpec>>,
}

impl ViewParams {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: None,
            filters: None,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_sort(mut self, column: impl Into<String>, desc: bool) -> Self {
        self.sort = Some(SortSpec {
            column: column.into(),
            desc,
        });
        self
    }

    pub fn with_filter(
        mut self,
        column: impl Into<String>,
        op: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.filters.get_or_insert_with(Vec::new).push(FilterSpec {
            column: column.into(),
            op: op.into(),
            value,
        });
        self
    }

    /// Zero-based page index as the server slices it.
    pub fn wire_page(&self) -> u32 {
        self.page.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_page_is_zero_based() {
        assert_eq!(ViewParams::new("t").wire_page(), 0);
        assert_eq!(ViewParams::new("t").with_page(3).wire_page(), 2);
        assert_eq!(ViewParams::new("t").with_page(0).page, 1);
    }

    #[test]
    fn test_filters_keep_order() {
        let view = ViewParams::new("orders")
            .with_filter("region", "=", json!("emea"))
            .with_filter("amount", ">", json!(100));
        let filters = view.filters.unwrap();
        assert_eq!(filters[0].column, "region");
        assert_eq!(filters[1].column, "amount");
    }
}
