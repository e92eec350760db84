//! `ato catalog` command - Inspect and validate plant data

use clap::{Subcommand, ValueEnum};
use console::style;
use miette::Result;

use crate::cli::helpers::{truncate_str, RunContext};
use crate::cli::output::{number, render_structured, write_output, Table};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Catalog;

#[derive(Subcommand, Debug)]
pub enum CatalogCommands {
    /// Show products, machines and components
    Show(ShowArgs),

    /// Load the catalog and report problems
    Validate,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Which part of the catalog to print
    #[arg(long, short = 's', value_enum, default_value = "all")]
    pub section: Section,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    All,
    Products,
    Machines,
    Components,
}

pub fn run(cmd: CatalogCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CatalogCommands::Show(args) => run_show(args, global),
        CatalogCommands::Validate => run_validate(global),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let ctx = RunContext::load(global)?;
    let catalog = &ctx.catalog;

    if global.format.is_structured() {
        return write_output(&render_structured(catalog, global.format)?, None, global.quiet);
    }

    let sections: &[Section] = match args.section {
        Section::All => &[Section::Products, Section::Machines, Section::Components],
        Section::Products => &[Section::Products],
        Section::Machines => &[Section::Machines],
        Section::Components => &[Section::Components],
    };

    // Delimited formats hold one table only
    let single = matches!(global.format, OutputFormat::Csv | OutputFormat::Tsv);
    let sections = if single { &sections[..1] } else { sections };

    let mut out = String::new();
    for (i, section) in sections.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let table = match section {
            Section::Products => products_table(catalog),
            Section::Machines => machines_table(catalog),
            _ => components_table(catalog),
        };
        out.push_str(&table.render(global.format)?);
    }
    write_output(&out, None, global.quiet)
}

fn products_table(catalog: &Catalog) -> Table {
    let mut table = Table::new(["product", "price", "components"]);
    for (j, product) in catalog.products().iter().enumerate() {
        let used = catalog.components().iter().filter(|c| c.is_used_by(j)).count();
        table.push_row([product.name.clone(), number(product.price, 2), used.to_string()]);
    }
    table
}

fn machines_table(catalog: &Catalog) -> Table {
    let mut table = Table::new(["machine", "daily_minutes", "weekly_capacity"]);
    for (m, machine) in catalog.machines().iter().enumerate() {
        table.push_row([
            machine.name.clone(),
            number(machine.daily_minutes, 0),
            number(catalog.weekly_capacity(m), 0),
        ]);
    }
    table
}

fn components_table(catalog: &Catalog) -> Table {
    let mut headers = vec!["component".to_string(), "cost".to_string()];
    headers.extend(catalog.machines().iter().map(|m| truncate_str(&m.name, 14)));
    headers.extend(catalog.products().iter().map(|p| p.name.clone()));

    let mut table = Table::new(headers);
    for component in catalog.components() {
        let mut row = vec![component.name.clone(), number(component.fixed_cost, 2)];
        row.extend(component.processing_minutes.iter().map(|t| number(*t, 0)));
        row.extend(component.gozinto.iter().map(|g| number(*g, 0)));
        table.push_row(row);
    }
    table
}

fn run_validate(global: &GlobalOpts) -> Result<()> {
    let ctx = RunContext::load(global)?;
    let catalog = &ctx.catalog;

    let source = match &ctx.config.catalog {
        Some(dir) => dir.display().to_string(),
        None => "built-in reference catalog".to_string(),
    };

    if !global.quiet {
        println!(
            "{} Catalog valid: {} components, {} products, {} machines ({})",
            style("✓").green(),
            style(catalog.num_components()).cyan(),
            style(catalog.num_products()).cyan(),
            style(catalog.num_machines()).cyan(),
            style(source).dim()
        );
    }

    let unused: Vec<&str> = catalog
        .components()
        .iter()
        .filter(|c| (0..catalog.num_products()).all(|j| !c.is_used_by(j)))
        .map(|c| c.name.as_str())
        .collect();
    for name in &unused {
        println!("{} Component '{}' is not used by any product", style("!").yellow(), name);
    }

    for (j, product) in catalog.products().iter().enumerate() {
        if !catalog.components().iter().any(|c| c.is_used_by(j)) {
            println!(
                "{} Product '{}' has an empty bill of materials",
                style("!").yellow(),
                product.name
            );
        }
    }

    Ok(())
}
