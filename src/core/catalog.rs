//! Resource catalog - components, machines and products of an ATO plant
//!
//! A catalog lives in a directory holding two CSV files:
//!
//! * `components_data.csv` - one row per component: name, processing minutes
//!   on every machine, gozinto factor for every product, fixed cost last.
//! * `products_machines.csv` - `<products>,<machines>` followed by one
//!   `name,price` row per product and one `name,daily minutes` row per machine.
//!
//! The registry file fixes the order of machines and products; the component
//! table must list its columns in exactly that order.

use miette::Diagnostic;
use rust_embed::Embed;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the component table inside a catalog directory
pub const COMPONENTS_FILE: &str = "components_data.csv";

/// File name of the product/machine registry inside a catalog directory
pub const REGISTRY_FILE: &str = "products_machines.csv";

/// Days per planning week used to scale daily machine minutes
pub const DEFAULT_OPERATING_DAYS: u32 = 7;

#[derive(Embed)]
#[folder = "data/"]
struct ReferenceData;

/// A finished product with its unit selling price
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub name: String,
    pub price: f64,
}

/// A machine and the minutes it can run per day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Machine {
    pub name: String,
    pub daily_minutes: f64,
}

impl Machine {
    /// Capacity over a planning week of `operating_days` days
    pub fn weekly_capacity(&self, operating_days: u32) -> f64 {
        self.daily_minutes * f64::from(operating_days)
    }
}

/// A procurable component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    pub name: String,

    /// Fixed cost paid per unit procured
    pub fixed_cost: f64,

    /// Minutes of machine time per unit, indexed like [`Catalog::machines`]
    pub processing_minutes: Vec<f64>,

    /// Units consumed per unit of product, indexed like [`Catalog::products`]
    pub gozinto: Vec<f64>,
}

impl Component {
    pub fn processing_time(&self, machine: usize) -> f64 {
        self.processing_minutes.get(machine).copied().unwrap_or(0.0)
    }

    pub fn gozinto_factor(&self, product: usize) -> f64 {
        self.gozinto.get(product).copied().unwrap_or(0.0)
    }

    /// Whether any unit of this component goes into the given product
    pub fn is_used_by(&self, product: usize) -> bool {
        self.gozinto_factor(product) > 0.0
    }
}

/// Validated, immutable plant data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    components: Vec<Component>,
    machines: Vec<Machine>,
    products: Vec<Product>,
    operating_days: u32,
}

impl Catalog {
    /// Build a catalog, checking dimensions and value ranges
    pub fn new(
        components: Vec<Component>,
        machines: Vec<Machine>,
        products: Vec<Product>,
    ) -> Result<Self, CatalogError> {
        if components.is_empty() {
            return Err(CatalogError::Empty);
        }

        for product in &products {
            if !product.price.is_finite() || product.price <= 0.0 {
                return Err(CatalogError::NonPositivePrice {
                    product: product.name.clone(),
                    price: product.price,
                });
            }
        }

        for machine in &machines {
            check_non_negative(
                &format!("daily minutes of machine '{}'", machine.name),
                machine.daily_minutes,
            )?;
        }

        for component in &components {
            if component.processing_minutes.len() != machines.len() {
                return Err(CatalogError::DimensionMismatch {
                    what: format!("processing times of component '{}'", component.name),
                    expected: machines.len(),
                    found: component.processing_minutes.len(),
                });
            }
            if component.gozinto.len() != products.len() {
                return Err(CatalogError::DimensionMismatch {
                    what: format!("gozinto factors of component '{}'", component.name),
                    expected: products.len(),
                    found: component.gozinto.len(),
                });
            }

            check_non_negative(
                &format!("fixed cost of component '{}'", component.name),
                component.fixed_cost,
            )?;
            for (machine, minutes) in machines.iter().zip(&component.processing_minutes) {
                check_non_negative(
                    &format!("time of '{}' on '{}'", component.name, machine.name),
                    *minutes,
                )?;
            }
            for (product, factor) in products.iter().zip(&component.gozinto) {
                check_non_negative(
                    &format!("gozinto factor of '{}' in '{}'", component.name, product.name),
                    *factor,
                )?;
            }
        }

        Ok(Self {
            components,
            machines,
            products,
            operating_days: DEFAULT_OPERATING_DAYS,
        })
    }

    /// Override the number of operating days per week
    pub fn with_operating_days(mut self, operating_days: u32) -> Result<Self, CatalogError> {
        if operating_days == 0 {
            return Err(CatalogError::InvalidOperatingDays(operating_days));
        }
        self.operating_days = operating_days;
        Ok(self)
    }

    /// The laptop reference catalog bundled with the binary
    pub fn reference() -> Result<Self, CatalogError> {
        let components = embedded(COMPONENTS_FILE)?;
        let registry = embedded(REGISTRY_FILE)?;
        Self::from_readers(components.as_slice(), registry.as_slice())
    }

    /// Load a catalog from a directory containing both CSV files
    pub fn load_dir(dir: &Path) -> Result<Self, CatalogError> {
        let components_path = dir.join(COMPONENTS_FILE);
        let registry_path = dir.join(REGISTRY_FILE);

        let components = File::open(&components_path).map_err(|e| CatalogError::Io {
            path: components_path.clone(),
            message: e.to_string(),
        })?;
        let registry = File::open(&registry_path).map_err(|e| CatalogError::Io {
            path: registry_path.clone(),
            message: e.to_string(),
        })?;

        Self::from_readers(components, registry)
    }

    /// Parse a catalog from the component table and registry contents
    pub fn from_readers<C: Read, R: Read>(components: C, registry: R) -> Result<Self, CatalogError> {
        let (products, machines) = parse_registry(registry)?;
        let components = parse_components(components, &machines, &products)?;
        Self::new(components, machines, products)
    }

    /// Write the catalog back into `dir` using the two-file layout
    pub fn write_dir(&self, dir: &Path) -> Result<(), CatalogError> {
        fs::create_dir_all(dir).map_err(|e| CatalogError::Io {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;

        let components_path = dir.join(COMPONENTS_FILE);
        let mut writer = csv::Writer::from_path(&components_path).map_err(|e| csv_error(COMPONENTS_FILE, e))?;

        let mut header = vec![String::new()];
        header.extend(self.machines.iter().map(|m| m.name.clone()));
        header.extend(self.products.iter().map(|p| p.name.clone()));
        header.push("price".to_string());
        writer.write_record(&header).map_err(|e| csv_error(COMPONENTS_FILE, e))?;

        for component in &self.components {
            let mut row = vec![component.name.clone()];
            row.extend(component.processing_minutes.iter().map(f64::to_string));
            row.extend(component.gozinto.iter().map(f64::to_string));
            row.push(component.fixed_cost.to_string());
            writer.write_record(&row).map_err(|e| csv_error(COMPONENTS_FILE, e))?;
        }
        writer.flush().map_err(|e| CatalogError::Io {
            path: components_path.clone(),
            message: e.to_string(),
        })?;

        let registry_path = dir.join(REGISTRY_FILE);
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&registry_path)
            .map_err(|e| csv_error(REGISTRY_FILE, e))?;
        writer
            .write_record([self.products.len().to_string(), self.machines.len().to_string()])
            .map_err(|e| csv_error(REGISTRY_FILE, e))?;
        for product in &self.products {
            writer
                .write_record([product.name.clone(), product.price.to_string()])
                .map_err(|e| csv_error(REGISTRY_FILE, e))?;
        }
        for machine in &self.machines {
            writer
                .write_record([machine.name.clone(), machine.daily_minutes.to_string()])
                .map_err(|e| csv_error(REGISTRY_FILE, e))?;
        }
        writer.flush().map_err(|e| CatalogError::Io {
            path: registry_path,
            message: e.to_string(),
        })?;

        Ok(())
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn operating_days(&self) -> u32 {
        self.operating_days
    }

    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    pub fn num_machines(&self) -> usize {
        self.machines.len()
    }

    pub fn num_products(&self) -> usize {
        self.products.len()
    }

    /// Weekly capacity of the machine at `index`, in minutes
    pub fn weekly_capacity(&self, index: usize) -> f64 {
        self.machines
            .get(index)
            .map(|m| m.weekly_capacity(self.operating_days))
            .unwrap_or(0.0)
    }

    /// Look up a product index by name
    pub fn product_index(&self, name: &str) -> Option<usize> {
        self.products.iter().position(|p| p.name == name)
    }
}

/// Errors raised while loading or validating a catalog
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("cannot access catalog file {path:?}: {message}")]
    #[diagnostic(code(ato::catalog::io))]
    Io { path: PathBuf, message: String },

    #[error("malformed CSV in {file}: {message}")]
    #[diagnostic(code(ato::catalog::csv))]
    Csv { file: String, message: String },

    #[error("{file} line {line}: '{value}' is not a number ({column})")]
    #[diagnostic(code(ato::catalog::number))]
    InvalidNumber {
        file: String,
        line: usize,
        column: String,
        value: String,
    },

    #[error("dimension mismatch in {what}: expected {expected}, found {found}")]
    #[diagnostic(
        code(ato::catalog::dimension_mismatch),
        help("the component table needs one column per machine and per product plus the price column, in registry order")
    )]
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("column {position} of {file} is '{found}' but the registry lists '{expected}'")]
    #[diagnostic(code(ato::catalog::header_mismatch))]
    HeaderMismatch {
        file: String,
        position: usize,
        expected: String,
        found: String,
    },

    #[error("{what} must be a non-negative number, got {value}")]
    #[diagnostic(code(ato::catalog::negative))]
    NegativeValue { what: String, value: f64 },

    #[error("product '{product}' must have a positive price, got {price}")]
    #[diagnostic(code(ato::catalog::price))]
    NonPositivePrice { product: String, price: f64 },

    #[error("operating days must be at least 1, got {0}")]
    #[diagnostic(code(ato::catalog::operating_days))]
    InvalidOperatingDays(u32),

    #[error("catalog has no components")]
    #[diagnostic(code(ato::catalog::empty))]
    Empty,

    #[error("embedded reference data '{0}' is missing")]
    #[diagnostic(code(ato::catalog::reference))]
    MissingReference(String),
}

fn embedded(name: &str) -> Result<Vec<u8>, CatalogError> {
    ReferenceData::get(name)
        .map(|file| file.data.into_owned())
        .ok_or_else(|| CatalogError::MissingReference(name.to_string()))
}

fn csv_error(file: &str, err: csv::Error) -> CatalogError {
    CatalogError::Csv {
        file: file.to_string(),
        message: err.to_string(),
    }
}

fn check_non_negative(what: &str, value: f64) -> Result<(), CatalogError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CatalogError::NegativeValue {
            what: what.to_string(),
            value,
        })
    }
}

fn parse_number(file: &str, line: usize, column: &str, value: &str) -> Result<f64, CatalogError> {
    value.parse::<f64>().map_err(|_| CatalogError::InvalidNumber {
        file: file.to_string(),
        line,
        column: column.to_string(),
        value: value.to_string(),
    })
}

fn parse_count(line: usize, column: &str, value: &str) -> Result<usize, CatalogError> {
    value.parse::<usize>().map_err(|_| CatalogError::InvalidNumber {
        file: REGISTRY_FILE.to_string(),
        line,
        column: column.to_string(),
        value: value.to_string(),
    })
}

fn parse_registry<R: Read>(reader: R) -> Result<(Vec<Product>, Vec<Machine>), CatalogError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let records = rdr
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| csv_error(REGISTRY_FILE, e))?;
    let rows: Vec<(usize, &csv::StringRecord)> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.iter().any(|field| !field.is_empty()))
        .map(|(i, r)| (i + 1, r))
        .collect();

    let (line, counts) = rows.first().copied().ok_or_else(|| CatalogError::DimensionMismatch {
        what: "registry count row".to_string(),
        expected: 2,
        found: 0,
    })?;
    if counts.len() < 2 {
        return Err(CatalogError::DimensionMismatch {
            what: "registry count row".to_string(),
            expected: 2,
            found: counts.len(),
        });
    }
    let num_products = parse_count(line, "product count", &counts[0])?;
    let num_machines = parse_count(line, "machine count", &counts[1])?;

    let entries = &rows[1..];
    let expected = num_products
        .checked_add(num_machines)
        .ok_or_else(|| CatalogError::DimensionMismatch {
            what: "registry rows".to_string(),
            expected: num_products,
            found: entries.len(),
        })?;
    if entries.len() != expected {
        return Err(CatalogError::DimensionMismatch {
            what: "registry rows".to_string(),
            expected,
            found: entries.len(),
        });
    }

    let mut products = Vec::with_capacity(num_products);
    let mut machines = Vec::with_capacity(num_machines);

    for (index, &(line, record)) in entries.iter().enumerate() {
        if record.len() < 2 {
            return Err(CatalogError::DimensionMismatch {
                what: format!("{} line {}", REGISTRY_FILE, line),
                expected: 2,
                found: record.len(),
            });
        }
        let name = record[0].to_string();
        if index < num_products {
            let price = parse_number(REGISTRY_FILE, line, "price", &record[1])?;
            products.push(Product { name, price });
        } else {
            let daily_minutes = parse_number(REGISTRY_FILE, line, "daily minutes", &record[1])?;
            machines.push(Machine { name, daily_minutes });
        }
    }

    Ok((products, machines))
}

fn parse_components<R: Read>(
    reader: R,
    machines: &[Machine],
    products: &[Product],
) -> Result<Vec<Component>, CatalogError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(|e| csv_error(COMPONENTS_FILE, e))?.clone();

    // name column + machines + products + price
    let width = machines.len() + products.len() + 2;
    if headers.len() != width {
        return Err(CatalogError::DimensionMismatch {
            what: format!("{} header", COMPONENTS_FILE),
            expected: width,
            found: headers.len(),
        });
    }

    let expected_names = machines
        .iter()
        .map(|m| m.name.as_str())
        .chain(products.iter().map(|p| p.name.as_str()));
    for (offset, expected) in expected_names.enumerate() {
        let found = &headers[offset + 1];
        if found != expected {
            return Err(CatalogError::HeaderMismatch {
                file: COMPONENTS_FILE.to_string(),
                position: offset + 2,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
    }

    let mut components = Vec::new();
    for (row_idx, result) in rdr.records().enumerate() {
        let line = row_idx + 2; // 1-indexed plus header row
        let record = result.map_err(|e| csv_error(COMPONENTS_FILE, e))?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        if record.len() != width {
            return Err(CatalogError::DimensionMismatch {
                what: format!("{} line {}", COMPONENTS_FILE, line),
                expected: width,
                found: record.len(),
            });
        }

        let numbers = (1..width)
            .map(|col| parse_number(COMPONENTS_FILE, line, &headers[col], &record[col]))
            .collect::<Result<Vec<_>, _>>()?;
        let (processing, rest) = numbers.split_at(machines.len());
        let (gozinto, cost) = rest.split_at(products.len());

        components.push(Component {
            name: record[0].to_string(),
            fixed_cost: cost[0],
            processing_minutes: processing.to_vec(),
            gozinto: gozinto.to_vec(),
        });
    }

    Ok(components)
}
