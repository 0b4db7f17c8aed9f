//! Table definitions and fixtures for the transactional and reporting test databases.

/// Subset of the Northwind schema read by the builds.
pub const NORTHWIND_SCHEMA: &str = r#"
    create table customers (
        customer_id bpchar primary key,
        company_name varchar(40) not null
    );

    create table categories (
        category_id smallint primary key,
        category_name varchar(15) not null,
        description text,
        picture bytea
    );

    create table products (
        product_id smallint primary key,
        product_name varchar(40) not null,
        supplier_id smallint,
        category_id smallint references categories (category_id),
        quantity_per_unit varchar(20),
        unit_price real,
        units_in_stock smallint,
        units_on_order smallint,
        reorder_level smallint,
        discontinued integer not null
    );

    create table orders (
        order_id smallint primary key,
        customer_id bpchar references customers (customer_id),
        order_date date,
        required_date date,
        shipped_date date
    );

    create table order_details (
        order_id smallint not null references orders (order_id),
        product_id smallint not null references products (product_id),
        unit_price real not null,
        quantity smallint not null,
        discount real not null,
        primary key (order_id, product_id)
    );
"#;

/// A handful of Northwind rows.
///
/// Product 72 is sold in order 10250 but is loaded into the product dimension only when the
/// product build sees it, which makes it useful for unresolved key tests.
pub const NORTHWIND_FIXTURES: &str = r#"
    insert into customers values
        ('VINET', 'Vins et alcools Chevalier'),
        ('TOMSP', 'Toms Spezialitaten'),
        ('HANAR', 'Hanari Carnes');

    insert into categories (category_id, category_name, description) values
        (1, 'Beverages', 'Soft drinks, coffees, teas, beers, and ales'),
        (4, 'Dairy Products', 'Cheeses');

    insert into products values
        (11, 'Queso Cabrales', 5, 4, '1 kg pkg.', 21, 22, 30, 30, 0),
        (42, 'Singaporean Hokkien Fried Mee', 20, 1, '32 - 1 kg pkgs.', 14, 26, 0, 0, 1),
        (72, 'Mozzarella di Giovanni', 14, 4, '24 - 200 g pkgs.', 34.8, 14, 0, 0, 0);

    insert into orders values
        (10248, 'VINET', '1996-07-04', '1996-08-01', '1996-07-16'),
        (10249, 'TOMSP', '1996-07-05', '1996-08-16', '1996-07-10'),
        (10250, 'HANAR', '1996-07-08', '1996-08-05', null);

    insert into order_details values
        (10248, 11, 14, 12, 0),
        (10248, 42, 9.8, 10, 0),
        (10248, 72, 34.8, 5, 0),
        (10249, 42, 9.8, 10, 0.1),
        (10250, 72, 20, 10, 0.1);
"#;

/// The star schema written by the builds.
///
/// `Fact_OrderMetrics` references `Dim_Product`, so `Dim_Product` can only be cleared with
/// `delete`.
pub const REPORTING_SCHEMA: &str = r#"
    create table "Dim_Category" (
        "CategoryKey" bigint generated always as identity primary key,
        "Source_CategoryID" integer not null unique,
        "CategoryName" text not null,
        "CategoryDescription" text
    );

    create table "Dim_Product" (
        "ProductKey" bigint generated always as identity primary key,
        "Source_ProductID" integer not null unique,
        "ProductName" text not null,
        "Source_SupplierID" integer,
        "Source_CategoryID" integer,
        "QuantityPerUnit" text,
        "UnitPrice" double precision,
        "UnitsInStock" smallint,
        "Discontinued" boolean not null
    );

    create table "Fact_OrderMetrics" (
        "Source_OrderID" integer not null,
        "Source_ProductID" integer not null,
        "ProductKey" bigint references "Dim_Product" ("ProductKey") on delete set null,
        "OrderDate" date,
        "RequiredDate" date,
        "ShippedDate" date,
        "Quantity" smallint not null,
        "Discount" real not null,
        "ExtendedPrice" numeric(19, 4),
        primary key ("Source_OrderID", "Source_ProductID")
    );
"#;

/// Defers the natural key uniqueness check of `Dim_Category` to commit time.
pub const DEFERRED_CATEGORY_UNIQUENESS: &str = r#"
    alter table "Dim_Category"
        drop constraint "Dim_Category_Source_CategoryID_key",
        add constraint "Dim_Category_Source_CategoryID_key"
            unique ("Source_CategoryID") deferrable initially deferred;
"#;

/// Makes `Dim_Category` a referenced table, so that truncating it must fail.
pub const CATEGORY_REFERENCE: &str = r#"
    alter table "Dim_Product"
        add constraint "Dim_Product_Category_fkey"
        foreign key ("Source_CategoryID") references "Dim_Category" ("Source_CategoryID");
"#;
