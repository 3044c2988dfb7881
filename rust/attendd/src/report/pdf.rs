use super::grid::{DailyGrid, DayLabel};
use super::model::{AttendanceReport, ReportRow};
use crate::config::Config;
use anyhow::{bail, Context};
use genpdf::elements::{Break, FrameCellDecorator, Paragraph, TableLayout};
use genpdf::style::{Color, Style};
use genpdf::{Document, Element as _};
use std::path::Path;

const COLUMNS: [&str; 7] = ["Roll No", "Name", "Class", "Date", "Subject", "Faculty", "Status"];
const COLUMN_WEIGHTS: [usize; 7] = [2, 3, 2, 2, 4, 3, 2];
const ALT_STAFF_MARKER: &str = " (alt)";
const ALT_STAFF_RGB: (u8, u8, u8) = (147, 51, 234);

const GRID_TITLE: &str = "Daily Consolidated Attendance Grid";
const GRID_LEGEND: &str = "Status: Present (P), Absent (A), On Duty (OD)";
const GRID_PRESENT_RGB: (u8, u8, u8) = (74, 222, 128);
const GRID_ABSENT_RGB: (u8, u8, u8) = (248, 113, 113);
const GRID_ON_DUTY_RGB: (u8, u8, u8) = (96, 165, 250);
const GRID_PARTIAL_RGB: (u8, u8, u8) = (249, 115, 22);

/// Colour and weight of one table cell's text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CellStyle {
    rgb: Option<(u8, u8, u8)>,
    bold: bool,
    italic: bool,
}

impl CellStyle {
    fn to_style(self) -> Style {
        let mut style = Style::new();
        if let Some((r, g, b)) = self.rgb {
            style = style.with_color(Color::Rgb(r, g, b));
        }
        if self.bold {
            style = style.bold();
        }
        if self.italic {
            style = style.italic();
        }
        style
    }
}

fn load_font(cfg: &Config) -> anyhow::Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>> {
    genpdf::fonts::from_files(&cfg.font_dir, &cfg.font_name, None).map_err(|e| {
        anyhow::anyhow!(
            "failed to load font family {} from {}: {}",
            cfg.font_name,
            cfg.font_dir.display(),
            e
        )
    })
}

fn faculty_cell(row: &ReportRow) -> String {
    if row.is_alternative_staff {
        format!("{}{}", row.faculty, ALT_STAFF_MARKER)
    } else {
        row.faculty.clone()
    }
}

fn row_cells(row: &ReportRow) -> [String; 7] {
    [
        row.roll_number.clone(),
        row.name.clone(),
        row.class_name.clone(),
        row.date.clone(),
        row.subject.clone(),
        faculty_cell(row),
        row.style.label.to_string(),
    ]
}

fn status_cell_style(row: &ReportRow) -> CellStyle {
    CellStyle {
        rgb: Some(row.style.rgb),
        bold: row.style.bold,
        italic: false,
    }
}

fn faculty_cell_style(row: &ReportRow) -> CellStyle {
    if row.is_alternative_staff {
        CellStyle {
            rgb: Some(ALT_STAFF_RGB),
            bold: false,
            italic: true,
        }
    } else {
        CellStyle::default()
    }
}

fn period_line(report: &AttendanceReport) -> String {
    let mut line = format!("Period: {} to {}", report.start_date, report.end_date);
    if let Some(class_name) = &report.class_name {
        line.push_str(&format!("  |  Class: {class_name}"));
    }
    line
}

fn summary_line(report: &AttendanceReport) -> String {
    let s = &report.summary;
    format!(
        "Sessions: {}  |  Present: {}  |  Absent: {}  |  On Duty: {}  |  Rate: {:.1}%",
        s.sessions, s.present, s.absent, s.on_duty, s.rate
    )
}

pub fn render_attendance_pdf(
    report: &AttendanceReport,
    cfg: &Config,
    out_path: &Path,
) -> anyhow::Result<()> {
    let family = load_font(cfg)?;
    let mut doc = Document::new(family);
    doc.set_title(report.title.clone());
    doc.set_font_size(9);

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    doc.push(Paragraph::new(cfg.institution.clone()).styled(Style::new().bold().with_font_size(16)));
    doc.push(Paragraph::new(report.title.clone()).styled(Style::new().bold().with_font_size(12)));
    doc.push(Paragraph::new(period_line(report)));
    doc.push(Paragraph::new(summary_line(report)));
    doc.push(Break::new(1));

    let mut table = TableLayout::new(COLUMN_WEIGHTS.to_vec());
    table.set_cell_decorator(FrameCellDecorator::new(true, true, false));

    let mut header = table.row();
    for title in COLUMNS {
        header.push_element(Paragraph::new(title).styled(Style::new().bold()));
    }
    header
        .push()
        .map_err(|e| anyhow::anyhow!("failed to add table header: {}", e))?;

    for row in &report.rows {
        let [roll, name, class_name, date, subject, faculty, status] = row_cells(row);
        table
            .row()
            .element(Paragraph::new(roll))
            .element(Paragraph::new(name))
            .element(Paragraph::new(class_name))
            .element(Paragraph::new(date))
            .element(Paragraph::new(subject))
            .element(Paragraph::new(faculty).styled(faculty_cell_style(row).to_style()))
            .element(Paragraph::new(status).styled(status_cell_style(row).to_style()))
            .push()
            .map_err(|e| anyhow::anyhow!("failed to add row for {}: {}", row.roll_number, e))?;
    }
    doc.push(table);

    write_document(doc, out_path)
}

fn write_document(doc: Document, out_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    doc.render_to_file(out_path)
        .map_err(|e| anyhow::anyhow!("failed to render {}: {}", out_path.display(), e))?;
    Ok(())
}

fn grid_cell_style(cell: &str) -> CellStyle {
    let rgb = match cell {
        "P" => GRID_PRESENT_RGB,
        "A" => GRID_ABSENT_RGB,
        "OD" => GRID_ON_DUTY_RGB,
        _ => return CellStyle::default(),
    };
    CellStyle {
        rgb: Some(rgb),
        bold: true,
        italic: false,
    }
}

fn day_label_cell(label: DayLabel) -> (&'static str, CellStyle) {
    let (text, rgb) = match label {
        DayLabel::Full => ("FULL", GRID_PRESENT_RGB),
        DayLabel::Partial => ("PARTIAL", GRID_PARTIAL_RGB),
        DayLabel::Absent => ("ABSENT", GRID_ABSENT_RGB),
    };
    (
        text,
        CellStyle {
            rgb: Some(rgb),
            bold: true,
            italic: false,
        },
    )
}

/// Roll No, Name, one `P<n>` column per recorded period, then the day label.
fn grid_columns(grid: &DailyGrid) -> (Vec<String>, Vec<usize>) {
    let mut titles = vec!["Roll No".to_string(), "Name".to_string()];
    let mut weights = vec![3, 5];
    for n in &grid.periods {
        titles.push(format!("P{n}"));
        weights.push(1);
    }
    titles.push("Status".to_string());
    weights.push(2);
    (titles, weights)
}

fn grid_heading(grid: &DailyGrid) -> String {
    let staff = if grid.staff.is_empty() {
        "N/A".to_string()
    } else {
        grid.staff.join(", ")
    };
    format!(
        "Date: {}  |  Class: {}  |  Staff: {}",
        grid.date, grid.class_name, staff
    )
}

/// Renders the daily consolidated grid on a landscape page.
pub fn render_daily_grid_pdf(grid: &DailyGrid, cfg: &Config, out_path: &Path) -> anyhow::Result<()> {
    if grid.periods.is_empty() {
        bail!(
            "no periods were marked for {} on {}",
            grid.class_name,
            grid.date
        );
    }
    let family = load_font(cfg)?;
    let mut doc = Document::new(family);
    doc.set_title(format!("{GRID_TITLE} {} {}", grid.class_name, grid.date));
    doc.set_font_size(9);
    let a4: genpdf::Size = genpdf::PaperSize::A4.into();
    doc.set_paper_size(genpdf::Size::new(a4.height, a4.width));

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    doc.push(Paragraph::new(cfg.institution.clone()).styled(Style::new().bold().with_font_size(16)));
    doc.push(Paragraph::new(GRID_TITLE).styled(Style::new().bold().with_font_size(14)));
    doc.push(Paragraph::new(grid_heading(grid)));
    doc.push(Paragraph::new(format!("Marked Sessions: {}", grid.periods.len())));
    doc.push(Paragraph::new(GRID_LEGEND));
    doc.push(Break::new(1));

    let (titles, weights) = grid_columns(grid);
    let mut table = TableLayout::new(weights);
    table.set_cell_decorator(FrameCellDecorator::new(true, true, false));

    let mut header = table.row();
    for title in titles {
        header.push_element(Paragraph::new(title).styled(Style::new().bold()));
    }
    header
        .push()
        .map_err(|e| anyhow::anyhow!("failed to add grid header: {}", e))?;

    for row in &grid.rows {
        let mut line = table.row();
        line.push_element(Paragraph::new(row.roll_number.clone()));
        line.push_element(Paragraph::new(row.name.clone()));
        for cell in &row.cells {
            line.push_element(Paragraph::new(cell.clone()).styled(grid_cell_style(cell).to_style()));
        }
        let (label, style) = day_label_cell(row.label);
        line.push_element(Paragraph::new(label).styled(style.to_style()));
        line.push()
            .map_err(|e| anyhow::anyhow!("failed to add grid row for {}: {}", row.roll_number, e))?;
    }
    doc.push(table);

    write_document(doc, out_path)
}
