use std::path::PathBuf;

use branchboard::{
    Cell, Config, Dashboard, Scalar, ScatterPoint, Series, SourceTables, Table, TrendPoint,
    ViewId, ViewOutput,
};
use clap::Parser;
use eyre::Result;

#[derive(Parser, Debug)]
#[clap(name = "branchboard", about, version)]
struct Args {
    /// Increase output logging verbosity.
    #[clap(short, long)]
    verbose: bool,

    /// Directory containing the seven CSV datasets.
    #[clap(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Optional config file (JSON or YAML).
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Emit all views as a single JSON document instead of text.
    #[clap(long)]
    json: bool,

    /// Which branch to report on. Omit to list the valid branch names.
    branch: Option<String>,
}

fn main() {
    let args = Args::parse();
    simple_logger::init_with_level(if args.verbose {
        log::Level::Debug
    } else {
        log::Level::Info
    })
    .unwrap();

    if let Err(e) = run(&args) {
        log::error!("Failed: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    let tables = SourceTables::load_from_dir(&args.data_dir)?;
    let mut dashboard = Dashboard::new(tables, config);

    let branch = match &args.branch {
        Some(branch) => branch.clone(),
        None => {
            println!("Available branches:");
            for name in dashboard.branch_names() {
                println!("  {}", name);
            }
            return Ok(());
        }
    };
    dashboard.select_branch(branch.clone());

    if args.json {
        render_json(&mut dashboard, &branch)
    } else {
        render_text(&mut dashboard, &branch)
    }
}

fn render_json(dashboard: &mut Dashboard, branch: &str) -> Result<()> {
    let mut views = serde_json::Map::new();
    for id in ViewId::ALL {
        views.insert(
            id.name().to_string(),
            serde_json::to_value(dashboard.view(id)?)?,
        );
    }
    let doc = serde_json::json!({
        "branch": branch,
        "views": views,
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn render_text(dashboard: &mut Dashboard, branch: &str) -> Result<()> {
    println!("Branch report: {}", branch);

    println!("\nDemographics");
    print_scalar(dashboard, ViewId::MedianIncome, "Median income", Format::Currency)?;
    print_scalar(
        dashboard,
        ViewId::UninsuredRate,
        "Residents without health insurance",
        Format::Percent,
    )?;
    print_scalar(
        dashboard,
        ViewId::UnemploymentRate,
        "Unemployment rate",
        Format::Percent,
    )?;
    print_scalar(
        dashboard,
        ViewId::FoodInsecurityRate,
        "Residents who are food insecure",
        Format::Percent,
    )?;
    print_series(dashboard, ViewId::AgeDistribution, "Age distribution")?;
    print_series(dashboard, ViewId::RaceDistribution, "Race/ethnicity")?;

    println!("\nCirculation");
    print_table(dashboard, ViewId::TopGenres, "Top genres checked out")?;
    print_table(dashboard, ViewId::TopBooks, "Top books checked out")?;
    print_table(dashboard, ViewId::TopDvds, "Top DVDs checked out")?;
    print_table(dashboard, ViewId::TopReadingLevels, "Checkouts by reading level")?;
    print_trend(
        dashboard,
        ViewId::PhysicalReadingTrend,
        "Physical item checkouts over time",
    )?;

    println!("\nVisits, programs, and computers");
    print_series(dashboard, ViewId::MonthlyVisits, "Monthly visits")?;
    print_table(
        dashboard,
        ViewId::AttendanceByAudience,
        "Average program attendance by age group",
    )?;
    print_points(
        dashboard,
        ViewId::ProgramScatter,
        "Start time vs. in-person attendance",
    )?;
    print_scalar(dashboard, ViewId::TotalStations, "Total stations", Format::Count)?;
    print_scalar(dashboard, ViewId::TotalSessions, "Total sessions", Format::Count)?;
    print_scalar(
        dashboard,
        ViewId::AvgSessionLength,
        "Average session length",
        Format::Minutes,
    )?;
    Ok(())
}

#[derive(Clone, Copy)]
enum Format {
    Currency,
    Percent,
    Count,
    Minutes,
}

fn print_scalar(
    dashboard: &mut Dashboard,
    id: ViewId,
    label: &str,
    format: Format,
) -> Result<()> {
    let scalar = match dashboard.view(id)? {
        ViewOutput::Scalar(s) => *s,
        _ => unreachable!("{} is registered as a scalar view", id),
    };
    println!("  {}: {}", label, format_scalar(scalar, format));
    Ok(())
}

fn format_scalar(scalar: Scalar, format: Format) -> String {
    match scalar {
        Scalar::NoData => "No data found".to_string(),
        Scalar::NotAvailable => "Data not available".to_string(),
        Scalar::Value(v) => match format {
            Format::Currency => format!("${}", group_thousands(v, 2)),
            Format::Percent => format!("{:.1}%", v * 100.0),
            Format::Count => group_thousands(v, 0),
            Format::Minutes => format!("{:.1} minutes", v),
        },
    }
}

/// Insert thousands separators into a non-negative number rendered with the
/// given number of decimal places.
fn group_thousands(value: f64, decimals: usize) -> String {
    let rendered = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rendered.as_str(), None),
    };
    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

fn print_series(dashboard: &mut Dashboard, id: ViewId, label: &str) -> Result<()> {
    let series: Series = match dashboard.view(id)? {
        ViewOutput::Series(s) => s.clone(),
        _ => unreachable!("{} is registered as a series view", id),
    };
    println!("  {}:", label);
    if series.is_empty() {
        println!("    No data found");
        return Ok(());
    }
    for point in &series.points {
        println!("    {:<12} {}", point.label, group_thousands(point.value, 1));
    }
    Ok(())
}

fn print_table(dashboard: &mut Dashboard, id: ViewId, label: &str) -> Result<()> {
    let table: Table = match dashboard.view(id)? {
        ViewOutput::Table(t) => t.clone(),
        _ => unreachable!("{} is registered as a table view", id),
    };
    println!("  {}:", label);
    if table.is_empty() {
        println!("    No data found");
        return Ok(());
    }
    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.name.len()).collect();
    let rendered: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(render_cell).collect())
        .collect();
    for row in &rendered {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }
    let header: Vec<String> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:<1$}", c.name, widths[i]))
        .collect();
    println!("    {}", header.join("  "));
    for row in &rendered {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<1$}", cell, widths[i]))
            .collect();
        println!("    {}", line.join("  "));
    }
    Ok(())
}

fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::Int(v) => group_thousands(*v as f64, 0),
        Cell::Float(v) => group_thousands(*v, 1),
        Cell::Text(s) => s.clone(),
    }
}

fn print_points(dashboard: &mut Dashboard, id: ViewId, label: &str) -> Result<()> {
    let points: Vec<ScatterPoint> = match dashboard.view(id)? {
        ViewOutput::Points(p) => p.clone(),
        _ => unreachable!("{} is registered as a points view", id),
    };
    println!("  {}:", label);
    if points.is_empty() {
        println!("    No data found");
        return Ok(());
    }
    for point in &points {
        let title = point.title.as_deref().unwrap_or("(untitled)");
        println!("    {}  {:>5}  {}", point.start_time, point.attendance, title);
    }
    Ok(())
}

fn print_trend(dashboard: &mut Dashboard, id: ViewId, label: &str) -> Result<()> {
    let trend: Vec<TrendPoint> = match dashboard.view(id)? {
        ViewOutput::Trend(t) => t.clone(),
        _ => unreachable!("{} is registered as a trend view", id),
    };
    println!("  {}:", label);
    if trend.is_empty() {
        println!("    No data found");
        return Ok(());
    }
    for point in &trend {
        println!(
            "    {}  {:<12} {}",
            point.month,
            point.category,
            group_thousands(point.count as f64, 0)
        );
    }
    Ok(())
}
