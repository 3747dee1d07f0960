//! Built-in catalog for the hotel portfolio income sheet

use super::{Catalog, ColumnDefinition, TableDefinition};
use indexmap::IndexMap;

pub const INCOME_SHEET_TABLE: &str = "final_income_sheet_new_seq";

/// Catalog used when no `CATALOG_PATH` override is configured
pub fn financial_catalog() -> Catalog {
    let mut tables = IndexMap::new();
    tables.insert(INCOME_SHEET_TABLE.to_string(), income_sheet());
    Catalog { tables }
}

fn income_sheet() -> TableDefinition {
    let mut columns = IndexMap::new();

    columns.insert(
        "Operator".to_string(),
        ColumnDefinition::with_values(
            "Name of the operating entity or organization. Every operator manages multiple properties.",
            Some(1),
            OPERATOR_VALUES,
        ),
    );
    columns.insert(
        "SQL_Property".to_string(),
        ColumnDefinition::with_values(
            "List of hotel properties in the portfolio, including various brands and locations across the United States. Every property is managed by an operator.",
            Some(2),
            SQL_PROPERTY_VALUES,
        ),
    );
    columns.insert(
        "SQL_Account_Name".to_string(),
        ColumnDefinition::with_values(
            "Categorizes financial data into account types: operational data, reserves, income, expenses, profits and fees, plus non-operating income and expenses and EBITDA.",
            Some(3),
            SQL_ACCOUNT_NAME_VALUES,
        ),
    );
    columns.insert(
        "SQL_Account_Category_Order".to_string(),
        ColumnDefinition::with_values(
            "Breakdown of SQL_Account_Name into more specific categories. Example: Department Expenses in SQL_Account_Name has 4 sub-categories here.",
            Some(4),
            SQL_ACCOUNT_CATEGORY_ORDER_VALUES,
        ),
    );
    columns.insert(
        "Sub_Account_Category_Order".to_string(),
        ColumnDefinition::with_values(
            "Breakdown of SQL_Account_Category_Order into more granular categories.",
            Some(5),
            SUB_ACCOUNT_CATEGORY_ORDER_VALUES,
        ),
    );
    columns.insert(
        "SQL_Account_Group_Name".to_string(),
        ColumnDefinition::with_values(
            "Further division of Sub_Account_Category_Order.",
            Some(6),
            SQL_ACCOUNT_GROUP_NAME_VALUES,
        ),
    );
    columns.insert(
        "Current_Actual_Month".to_string(),
        ColumnDefinition::free(
            "Actual financial performance for the month. Use this column for aggregations and calculations when answering income sheet questions.",
        ),
    );
    columns.insert(
        "YoY_Change".to_string(),
        ColumnDefinition::free(
            "Percentage change compared to the same month in the prior year, computed for trend analysis.",
        ),
    );
    columns.insert(
        "Month".to_string(),
        ColumnDefinition::with_values(
            "Time period in YYYY-MM-DD format. For a specific month (e.g. 'June 2024') use '2024-06-01'. Covers January 2021 through October 2024; use strftime or date functions for month matching.",
            None,
            MONTH_VALUES,
        ),
    );

    let mut relationships = IndexMap::new();
    relationships.insert("balance_sheet".to_string(), "Impacts through P&L".to_string());
    relationships.insert(
        "forecast_sheet".to_string(),
        "Actual vs forecast comparison".to_string(),
    );

    TableDefinition {
        description: "Tracks revenue, expenses, and profitability over a period".to_string(),
        key_purposes: vec![
            "Monitor revenue and expenses".to_string(),
            "Track profitability".to_string(),
            "Compare actual vs budget".to_string(),
        ],
        common_queries: vec![
            "Revenue by type".to_string(),
            "Expense analysis".to_string(),
            "Profit margins".to_string(),
            "Common questions about the analysis".to_string(),
        ],
        relationships,
        columns,
    }
}

const OPERATOR_VALUES: &[&str] = &[
    "Marriott", "HHM", "Remington", "24/7",
];

const SQL_PROPERTY_VALUES: &[&str] = &[
    "AC Wailea", "Courtyard LA Pasadena Old Town", "Courtyard Washington DC Dupont Circle",
    "Hilton Garden Inn Bethesda", "Marriott Crystal City", "Moxy Washington DC Downtown",
    "Residence Inn Pasadena", "Residence Inn Westshore Tampa", "Skyrock Inn Sedona",
    "Steward Santa Barbara", "Surfrider Malibu",
];

const SQL_ACCOUNT_NAME_VALUES: &[&str] = &[
    "Operational Data", "Replacement Reserve", "Net Operating Income after Reserve", "Revenue",
    "Department Expenses", "Department Profit (Loss", "Undistributed Expenses",
    "Gross Operating Profit", "Management Fees", "Income Before Non-Operating Inc & Exp",
    "Non-Operating Income & Expenses", "Total Non-Operating Income & Expenses", "EBITDA", "-",
];

const SQL_ACCOUNT_CATEGORY_ORDER_VALUES: &[&str] = &[
    "Available Rooms", "Rooms Sold", "Occupancy %", "Average Rate", "RevPar",
    "Replacement Reserve", "NOI after Reserve", "NOI Margin", "Room Revenue", "F&B Revenue",
    "Other Revenue", "Miscellaneous Income", "Total Operating Revenue", "Room Expense",
    "F&B Expense", "Other Expense", "Total Department Expense", "Department Profit (Loss)",
    "A&G Expense", "Information & Telecommunications", "Sales & Marketing", "Maintenance",
    "Utilities", "Total Undistributed Expenses", "GOP", "GOP Margin", "Management Fees",
    "Income Before Non-Operating Inc & Exp", "Property & Other Taxes", "Insurance",
    "Other (Non-Operating I&E)", "Total Non-Operating Income & Expenses", "EBITDA",
];

const SUB_ACCOUNT_CATEGORY_ORDER_VALUES: &[&str] = &[
    "-", "Replacement Reserve", "EBITDA less REPLACEMENT RESERVE", "Rooms", "Food & Beverage",
    "Other", "Market", "Rooms Other", "Benefits/Bonus % Wages", "Overtime Premium",
    "Hourly Wages", "Management Wages", "FTG InRoom Services", "Walked Guest", "TA Commission",
    "Cluster Reservation Cost", "Comp F&B", "Guest Supplies", "Suite Supplies", "Laundry",
    "Cleaning Supplies", "Linen", "F&B Other", "Service Charge Distribution", "Beverage Cost",
    "Food Cost", "Other Sales Expense", "Market Expense", "A&G Other", "Uniforms",
    "Program Services Contribution", "Transportation/Van Expense", "Chargebacks",
    "Employee Relations", "Training", "Postage", "Bad Debt", "Credit and Collection", "Travel",
    "Office Supplies", "Pandemic Preparedness", "Outside Labor Services", "TOTAL I&TS CONT.",
    "IT Compliance", "FTG Internet", "Guest Communications", "Sales & Mkt. Other",
    "Revenue Management", "BT Booking Cost", "Sales Shared Services", "Loyalty",
    "Marketing & eCommerce", "Marketing Fund", "PO&M Other", "Cluster Engineering",
    "PO&M NonContract", "PO&M Contract", "UTILITIES", "Gross Operating Profit",
    "Management Fees", "Real Estate Tax", "Over/Under Sales Tax", "Property Insurance",
    "Casualty Insurance", "Other Investment Factors", "Gain Loss Fx", "Prior Year Adjustment",
    "Lease Payments", "Chain Services", "Land Rent", "Guest Accidents", "Franchise Fees",
    "System Fees", "EBITDA", "NOI after Reserve", "Net Income", "Other Operated Departments",
    "Administrative & General", "ADMINISTRATIVE & GENERAL", "INFORMATION & TELECOMM.",
    "Information & Telecommunications", "FRANCHISE FEES", "Sales & Marketing",
    "Available Rooms", "Property Operations & Maintenance", "Utilities",
    "Property & Other Taxes", "Real Estate Property Tax", "Personal Property Tax",
    "Business Tax", "Insurance - Property", "Insurance General", "Cyber Insurance",
    "Employment Practices Insurance", "Insurance", "Professional Services",
    "Legal & Accounting", "Interest", "Interest Expense-other", "Lease Income",
    "Total Food and Beverage", "Total Other Operated Departments", "Miscellaneous Income",
    "Minor Ops", "Franchise Taxes Owner", "Other Expense",
    "Total Other Operated Departments Expense", "Miscellaneous Expense",
    "Information & Telecommunications Sys.", "MANAGEMENT FEE", "REAL ESTATE/OTHER TAXES",
    "HOTEL BED TAX CONTR", "Property & Other taxes", "Income", "Rent & Leases",
    "FFE Replacement Exp", "Ownership Expense Owner", "Depreciation and Amortization",
    "Owner Expenses", "EXTERNAL AUDIT FEES", "DEFERRED MAINT. PRE-OPENING", "COMMON AREA",
    "Rent", "RENT BASE", "RENT VARIABLE", "TRS LATE FEE", "RATELOCK EXPENSE", "BUDGET VARIANCE",
    "CORPORATE OVERHEAD", "OFFICE BLDG CASH FL", "PROF SVCS-LEGAL", "PROF SVCS",
    "PROF SVCS-ENVIRONMENTAL", "PROF SVCS-ACCOUNTING", "PROF SVCS-OTHER", "BAD DEBT EXPENSE",
    "INCENTIVE MANAGEMENT FEE", "PRE-OPENING EXPENSE", "AMORTIZATION EXPENSE", "OID W/O",
    "PROCEEDS FROM CONVERSION", "BASIS OF N/R", "LONG TERM CAPITAL GAIN", "OVERHEAD ALLOCATION",
    "INTEREST EXPENSE", "Asset Management Fee", "Rent & Other Property/Equipment",
    "Marketing Training", "Prior Year Adj Tax", "Property Tax", "ASSET MANAGEMENT FEES",
    "Management Fee Expense", "NET OPERATING INCOME", "ROOMS", "FOOD & BEVERAGE",
    "OTHER INCOME", "SALES & MARKETING", "REPAIRS & MAINTENANCE", "PROPERTY TAX",
    "PERSONAL PROPERTY TAX", "LIABILITY INSURANCE", "EQUIPMENT LEASES", "OWNER'S EXPENSE",
    "LOAN INTEREST", "ASSET MANAGEMENT FEE", "REPLACEMENT RESERVES", "Minibar", "Mini Bar",
    "Info & Telecom Systems", "Property Operations", "Interest Expense", "Owner Expense",
    "Reserve for Replacement",
];

const SQL_ACCOUNT_GROUP_NAME_VALUES: &[&str] = &[
    "-", "EBITDA less REPLACEMENT RESERVE", "Rooms", "Food & Beverage", "Other",
    "Guest Communications", "Market", "Rooms Other", "Incentive Expense", "Payroll Taxes",
    "Workers' Comp", "Bonus", "Medical", "Overtime Premium", "Hourly Wages", "Management Wages",
    "FTG InRoom Services", "Walked Guest", "TA Commission", "Cluster Reservation Cost",
    "Comp F&B", "Guest Supplies", "Suite Supplies", "Laundry", "Cleaning Supplies", "Linen",
    "F&B Other", "Service Charge Distribution", "Beverage Cost", "Food Cost",
    "Other Sales Expense", "Market Expense", "Uniforms", "CAS System Support", "Over/Short",
    "A&G Other", "Program Services Contribution", "Transportation/Van Expense", "Chargebacks",
    "Employee Relations", "Training", "Postage", "Bad Debt", "Credit and Collection", "Travel",
    "Office Supplies", "Pandemic Preparedness", "Outside Labor Services", "TOTAL I&TS CONT.",
    "IT Compliance", "FTG Internet", "Sales Executive Share", "Sales Exec Overhead Dept",
    "Revenue Management", "BT Booking Cost", "Sales Shared Services", "Loyalty",
    "Marketing & eCommerce", "Marketing Fund", "PO&M Other", "Cluster Engineering",
    "PO&M NonContract", "PO&M Contract", "UTILITIES", "Water/Sewer", "Gas", "Electricity",
    "Gross Operating Profit", "Real Estate Tax", "Over/Under Sales Tax", "Property Insurance",
    "Casualty Insurance", "Other Investment Factors", "71132 Common Area Chgs", "Gain Loss Fx",
    "Prior Year Adjustment", "Lease Payments", "Chain Services", "Land Rent", "Guest Accidents",
    "Franchise Fees", "System Fees", "EBITDA", "Marketing Training", "Prior Year Adj Tax",
    "Property Tax",
];

const MONTH_VALUES: &[&str] = &[
    "2024-10-01", "2024-08-01", "2024-09-01", "2024-07-01", "2024-06-01", "2024-04-01",
    "2022-11-01", "2024-05-01", "2022-05-01", "2022-03-01", "2022-02-01", "2021-12-01",
    "2023-03-01", "2023-01-01", "2023-04-01", "2023-02-01", "2024-01-01", "2023-12-01",
    "2024-02-01", "2022-12-01", "2022-10-01", "2023-10-01", "2023-09-01", "2023-08-01",
    "2023-11-01", "2022-08-01", "2022-06-01", "2022-04-01", "2022-07-01", "2022-09-01",
    "2022-01-01", "2021-11-01", "2021-10-01", "2021-08-01", "2023-06-01", "2023-05-01",
    "2023-07-01", "2021-09-01", "2024-03-01", "2021-05-01", "2021-06-01", "2021-07-01",
    "2021-03-01", "2021-04-01", "2021-02-01", "2021-01-01",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_income_sheet_shape() {
        let catalog = financial_catalog();
        assert_eq!(catalog.first_table(), INCOME_SHEET_TABLE);

        let table = catalog.table(INCOME_SHEET_TABLE).unwrap();
        assert_eq!(table.columns.keys().next().map(String::as_str), Some("Operator"));
        assert_eq!(table.columns.len(), 9);
        assert_eq!(table.column("SQL_Property").unwrap().distinct_values.len(), 11);
        assert_eq!(table.column("SQL_Property").unwrap().hierarchy_level, Some(2));
        assert!(!table.column("Current_Actual_Month").unwrap().has_vocabulary());
    }

    #[test]
    fn test_property_vocabulary_is_exact() {
        let catalog = financial_catalog();
        let column = catalog.column(INCOME_SHEET_TABLE, "SQL_Property").unwrap();
        assert!(column.distinct_values.iter().any(|v| v == "AC Wailea"));
        assert!(column
            .distinct_values
            .iter()
            .any(|v| v == "Residence Inn Westshore Tampa"));
    }
}
