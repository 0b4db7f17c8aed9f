//! The three builds of the star schema and the source queries feeding them.

use std::fmt;

use crate::contract::{DIM_CATEGORY, DIM_PRODUCT, FACT_ORDER_METRICS, TableContract};
use crate::source::SourceQuery;

pub const CATEGORIES_QUERY: SourceQuery = SourceQuery {
    name: "categories",
    sql: r#"
        select
            category_id as "CategoryID",
            category_name as "CategoryName",
            description as "Description"
        from categories
        order by category_id
    "#,
};

pub const PRODUCTS_QUERY: SourceQuery = SourceQuery {
    name: "products",
    sql: r#"
        select
            product_id as "ProductID",
            product_name as "ProductName",
            supplier_id as "SupplierID",
            category_id as "CategoryID",
            quantity_per_unit as "QuantityPerUnit",
            unit_price as "UnitPrice",
            units_in_stock as "UnitsInStock",
            discontinued as "Discontinued"
        from products
        order by product_id
    "#,
};

pub const ORDER_LINES_QUERY: SourceQuery = SourceQuery {
    name: "order_lines",
    sql: r#"
        select
            od.order_id as "OrderID",
            od.product_id as "ProductID",
            o.order_date as "OrderDate",
            o.required_date as "RequiredDate",
            o.shipped_date as "ShippedDate",
            od.quantity as "Quantity",
            od.discount as "Discount",
            od.unit_price as "UnitPrice"
        from order_details od
        join orders o on o.order_id = od.order_id
        order by od.order_id, od.product_id
    "#,
};

/// An independently runnable build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildKind {
    CategoryDimension,
    ProductDimension,
    OrderMetricsFact,
}

impl BuildKind {
    /// Every build, dimensions before the fact build that depends on them.
    pub fn all() -> [BuildKind; 3] {
        [
            BuildKind::CategoryDimension,
            BuildKind::ProductDimension,
            BuildKind::OrderMetricsFact,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildKind::CategoryDimension => "category",
            BuildKind::ProductDimension => "product",
            BuildKind::OrderMetricsFact => "order-metrics",
        }
    }

    /// Target table of the build.
    pub fn contract(&self) -> &'static TableContract {
        match self {
            BuildKind::CategoryDimension => &DIM_CATEGORY,
            BuildKind::ProductDimension => &DIM_PRODUCT,
            BuildKind::OrderMetricsFact => &FACT_ORDER_METRICS,
        }
    }

    pub fn source_query(&self) -> &'static SourceQuery {
        match self {
            BuildKind::CategoryDimension => &CATEGORIES_QUERY,
            BuildKind::ProductDimension => &PRODUCTS_QUERY,
            BuildKind::OrderMetricsFact => &ORDER_LINES_QUERY,
        }
    }
}

impl fmt::Display for BuildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_run_before_the_fact() {
        let order = BuildKind::all().map(|build| build.contract().name);

        assert_eq!(order, ["Dim_Category", "Dim_Product", "Fact_OrderMetrics"]);
    }

    #[test]
    fn queries_alias_source_identifiers() {
        assert!(CATEGORIES_QUERY.sql.contains(r#"category_id as "CategoryID""#));
        assert!(PRODUCTS_QUERY.sql.contains(r#"product_id as "ProductID""#));
        assert!(ORDER_LINES_QUERY.sql.contains(r#"od.order_id as "OrderID""#));
    }
}
