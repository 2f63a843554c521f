//! Built-in feature catalog and table schemas.

use super::{FeatureDescriptor, PropertyDescriptor};
use crate::feature::FeatureCategory;
use crate::property::DataType;
use crate::schema::{ColumnSchema, TableSchema};

fn prop(table: &str, column: &str, data_type: DataType) -> PropertyDescriptor {
    PropertyDescriptor::new(table, column, data_type)
}

fn external_id_and_name(table: &str) -> Vec<PropertyDescriptor> {
    vec![
        prop(table, "ExternalId", DataType::String).required(),
        prop(table, "Name", DataType::String).required(),
        prop(table, "Description", DataType::String),
    ]
}

pub(super) fn features() -> Vec<FeatureDescriptor> {
    let plants: Vec<_> = external_id_and_name("Plants")
        .into_iter()
        .chain([prop("Plants", "SortIndex", DataType::Int)])
        .collect();

    let departments: Vec<_> = external_id_and_name("Departments")
        .into_iter()
        .chain([
            prop("Departments", "PlantExternalId", DataType::String)
                .required()
                .depends_on(["Plants"]),
            prop("Departments", "SortIndex", DataType::Int),
        ])
        .collect();

    let resources: Vec<_> = external_id_and_name("Resources")
        .into_iter()
        .chain([
            prop("Resources", "PlantExternalId", DataType::String)
                .required()
                .depends_on(["Plants"]),
            prop("Resources", "DepartmentExternalId", DataType::String)
                .required()
                .depends_on(["Departments"]),
            prop("Resources", "Bottleneck", DataType::Boolean),
        ])
        .collect();

    let products: Vec<_> = external_id_and_name("Products")
        .into_iter()
        .chain([prop("Products", "UnitOfMeasure", DataType::String)])
        .collect();

    let orders: Vec<_> = external_id_and_name("Orders")
        .into_iter()
        .chain([
            prop("Orders", "ProductExternalId", DataType::String)
                .required()
                .depends_on(["Products"]),
            prop("Orders", "Quantity", DataType::Decimal).required(),
            prop("Orders", "DueDate", DataType::DateTime),
            prop("Orders", "Priority", DataType::Int),
            prop("Orders", "Revenue", DataType::Decimal),
        ])
        .collect();

    let operations = vec![
        prop("Operations", "ExternalId", DataType::String).required(),
        prop("Operations", "OrderExternalId", DataType::String)
            .required()
            .depends_on(["Orders"]),
        prop("Operations", "Name", DataType::String).required(),
        prop("Operations", "Sequence", DataType::Short).required(),
        prop("Operations", "ResourceExternalId", DataType::String).depends_on(["Resources"]),
        prop("Operations", "SetupHours", DataType::Double),
        prop("Operations", "RunHours", DataType::Double),
    ];

    let tank = vec![
        prop("Resources", "IsTank", DataType::Boolean)
            .required()
            .depends_on(["Tank"]),
        prop("Resources", "TankCapacity", DataType::Double).depends_on(["Tank"]),
    ];

    let capacity = vec![
        prop("Resources", "Capacity", DataType::Double)
            .required()
            .depends_on(["Capacity"]),
        prop("Resources", "CapacityType", DataType::String).depends_on(["Capacity"]),
    ];

    let order_attributes = vec![
        prop("Orders", "Customer", DataType::String),
        prop("Orders", "Hot", DataType::Boolean),
        prop("Orders", "Notes", DataType::String),
        prop("Orders", "Revenue", DataType::Decimal),
    ];

    let costing = vec![
        prop("Resources", "StandardHourlyCost", DataType::Decimal).depends_on(["Costing"]),
        prop("Products", "UnitCost", DataType::Decimal).depends_on(["Costing"]),
        prop("Orders", "Revenue", DataType::Decimal),
        prop("Operations", "SetupCost", DataType::Decimal).depends_on(["Costing"]),
    ];

    vec![
        FeatureDescriptor::new("Plants", FeatureCategory::Core, plants)
            .with_enabled(true)
            .with_step(1),
        FeatureDescriptor::new("Departments", FeatureCategory::Core, departments)
            .with_enabled(true)
            .with_step(2),
        FeatureDescriptor::new("Resources", FeatureCategory::Core, resources)
            .with_enabled(true)
            .with_step(3),
        FeatureDescriptor::new("Products", FeatureCategory::Core, products)
            .with_enabled(true)
            .with_step(4),
        FeatureDescriptor::new("Orders", FeatureCategory::Core, orders)
            .with_enabled(true)
            .with_step(5),
        FeatureDescriptor::new("Operations", FeatureCategory::AdvancedTables, operations)
            .with_step(6),
        FeatureDescriptor::new("Tank", FeatureCategory::Feature, tank).with_step(10),
        FeatureDescriptor::new("Capacity", FeatureCategory::Feature, capacity).with_step(11),
        FeatureDescriptor::new("OrderAttributes", FeatureCategory::Feature, order_attributes)
            .with_step(12),
        FeatureDescriptor::new("Costing", FeatureCategory::Feature, costing).with_step(13),
    ]
}

fn key_columns(extra: Vec<ColumnSchema>) -> Vec<ColumnSchema> {
    let mut columns = vec![
        ColumnSchema::new("Id", DataType::Long).not_null().not_importable(),
        ColumnSchema::new("ExternalId", DataType::String).not_null(),
        ColumnSchema::new("Name", DataType::String).not_null(),
        ColumnSchema::new("Description", DataType::String),
    ];
    columns.extend(extra);
    columns.push(ColumnSchema::new("LastModified", DataType::DateTime).not_importable());
    columns
}

pub(super) fn schemas() -> Vec<TableSchema> {
    vec![
        TableSchema::new(
            "Plants",
            key_columns(vec![ColumnSchema::new("SortIndex", DataType::Int)]),
        ),
        TableSchema::new(
            "Departments",
            key_columns(vec![
                ColumnSchema::new("PlantExternalId", DataType::String).not_null(),
                ColumnSchema::new("SortIndex", DataType::Int),
            ]),
        ),
        TableSchema::new(
            "Resources",
            key_columns(vec![
                ColumnSchema::new("PlantExternalId", DataType::String).not_null(),
                ColumnSchema::new("DepartmentExternalId", DataType::String).not_null(),
                ColumnSchema::new("Bottleneck", DataType::Boolean),
                ColumnSchema::new("IsTank", DataType::Boolean),
                ColumnSchema::new("TankCapacity", DataType::Double),
                ColumnSchema::new("Capacity", DataType::Double),
                ColumnSchema::new("CapacityType", DataType::String),
                ColumnSchema::new("StandardHourlyCost", DataType::Decimal),
            ]),
        ),
        TableSchema::new(
            "Products",
            key_columns(vec![
                ColumnSchema::new("UnitOfMeasure", DataType::String),
                ColumnSchema::new("UnitCost", DataType::Decimal),
            ]),
        ),
        TableSchema::new(
            "Orders",
            key_columns(vec![
                ColumnSchema::new("ProductExternalId", DataType::String).not_null(),
                ColumnSchema::new("Quantity", DataType::Decimal).not_null(),
                ColumnSchema::new("DueDate", DataType::DateTime),
                ColumnSchema::new("Priority", DataType::Int),
                ColumnSchema::new("Customer", DataType::String),
                ColumnSchema::new("Hot", DataType::Boolean),
                ColumnSchema::new("Notes", DataType::String),
                ColumnSchema::new("Revenue", DataType::Decimal),
            ]),
        ),
        TableSchema::new(
            "Operations",
            vec![
                ColumnSchema::new("Id", DataType::Long).not_null().not_importable(),
                ColumnSchema::new("ExternalId", DataType::String).not_null(),
                ColumnSchema::new("OrderExternalId", DataType::String).not_null(),
                ColumnSchema::new("Name", DataType::String).not_null(),
                ColumnSchema::new("Sequence", DataType::Short).not_null(),
                ColumnSchema::new("ResourceExternalId", DataType::String),
                ColumnSchema::new("SetupHours", DataType::Double),
                ColumnSchema::new("RunHours", DataType::Double),
                ColumnSchema::new("SetupCost", DataType::Decimal),
            ],
        ),
    ]
}
