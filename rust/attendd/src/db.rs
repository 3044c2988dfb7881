use crate::import::{DepartmentEntry, ValidatedEntry, ValidatedStudent};
use crate::resolve::{ClassCatalogEntry, Stream};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

pub const DB_FILE: &str = "attendd.sqlite3";

const SEED_STREAMS: [(&str, &str, &str); 6] = [
    ("cse", "Computer Science and Engineering", "CSE"),
    ("it", "Information Technology", "IT"),
    ("ece", "Electronics and Communication Engineering", "ECE"),
    ("eee", "Electrical and Electronics Engineering", "EEE"),
    ("mech", "Mechanical Engineering", "MECH"),
    ("civil", "Civil Engineering", "CIVIL"),
];

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS streams(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            code TEXT NOT NULL
        )",
        [],
    )?;
    for (id, name, code) in SEED_STREAMS {
        conn.execute(
            "INSERT OR IGNORE INTO streams(id, name, code) VALUES(?, ?, ?)",
            (id, name, code),
        )?;
    }

    conn.execute(
        "CREATE TABLE IF NOT EXISTS departments(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            code TEXT,
            stream_id TEXT,
            FOREIGN KEY(stream_id) REFERENCES streams(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            department_id TEXT,
            stream_id TEXT,
            FOREIGN KEY(department_id) REFERENCES departments(id),
            FOREIGN KEY(stream_id) REFERENCES streams(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_classes_stream ON classes(stream_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            roll_number TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            class_id TEXT NOT NULL,
            department_id TEXT,
            stream_id TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            email TEXT,
            phone TEXT,
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_id)",
        [],
    )?;
    // Workspaces created before suspension/intern tracking lack the column.
    ensure_students_status(&conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS timetable(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            day_of_week INTEGER NOT NULL,
            period_number INTEGER NOT NULL,
            subject_code TEXT NOT NULL,
            subject_name TEXT NOT NULL,
            faculty_name TEXT NOT NULL,
            faculty_code TEXT,
            room_number TEXT,
            is_lab INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_timetable_class_slot
         ON timetable(class_id, day_of_week, period_number)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS period_attendance(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            timetable_id TEXT,
            date TEXT NOT NULL,
            period_number INTEGER NOT NULL,
            subject_code TEXT NOT NULL,
            subject_name TEXT NOT NULL,
            faculty_name TEXT NOT NULL,
            is_alternative_staff INTEGER NOT NULL DEFAULT 0,
            alternative_staff_name TEXT,
            marked_at TEXT NOT NULL,
            FOREIGN KEY(class_id) REFERENCES classes(id),
            UNIQUE(class_id, date, period_number)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_period_attendance_date ON period_attendance(date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS period_student_attendance(
            id TEXT PRIMARY KEY,
            period_attendance_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            status TEXT NOT NULL,
            approval_status TEXT,
            FOREIGN KEY(period_attendance_id) REFERENCES period_attendance(id),
            FOREIGN KEY(student_id) REFERENCES students(id),
            UNIQUE(period_attendance_id, student_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_psa_period ON period_student_attendance(period_attendance_id)",
        [],
    )?;

    // Bell schedule shared by every class.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS period_times(
            period_number INTEGER PRIMARY KEY,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL
        )",
        [],
    )?;

    info!(path = %db_path.display(), "workspace database ready");
    Ok(conn)
}

fn ensure_students_status(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "students", "status")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE students ADD COLUMN status TEXT NOT NULL DEFAULT 'active'",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn load_streams(conn: &Connection) -> rusqlite::Result<Vec<Stream>> {
    let mut stmt = conn.prepare("SELECT id, name, code FROM streams ORDER BY rowid")?;
    let rows = stmt.query_map([], |r| {
        Ok(Stream {
            id: r.get(0)?,
            name: r.get(1)?,
            code: r.get(2)?,
        })
    })?;
    rows.collect()
}

pub fn load_class_catalog(conn: &Connection) -> rusqlite::Result<Vec<ClassCatalogEntry>> {
    let mut stmt = conn.prepare("SELECT id, name, department_id FROM classes ORDER BY name")?;
    let rows = stmt.query_map([], |r| {
        Ok(ClassCatalogEntry {
            id: r.get(0)?,
            name: r.get(1)?,
            department_id: r.get(2)?,
        })
    })?;
    rows.collect()
}

pub fn load_departments(conn: &Connection) -> rusqlite::Result<Vec<DepartmentEntry>> {
    let mut stmt = conn.prepare("SELECT id, name, code FROM departments ORDER BY name")?;
    let rows = stmt.query_map([], |r| {
        Ok(DepartmentEntry {
            id: r.get(0)?,
            name: r.get(1)?,
            code: r.get(2)?,
        })
    })?;
    rows.collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableEntry {
    pub id: String,
    pub class_id: String,
    pub day_of_week: u8,
    pub period_number: u8,
    pub subject_code: String,
    pub subject_name: String,
    pub faculty_name: String,
    pub faculty_code: Option<String>,
    pub room_number: Option<String>,
    pub is_lab: bool,
}

pub fn load_timetable(conn: &Connection, class_id: &str) -> rusqlite::Result<Vec<TimetableEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, class_id, day_of_week, period_number, subject_code, subject_name,
                faculty_name, faculty_code, room_number, is_lab
         FROM timetable
         WHERE class_id = ?
         ORDER BY day_of_week, period_number, rowid",
    )?;
    let rows = stmt.query_map([class_id], |r| {
        Ok(TimetableEntry {
            id: r.get(0)?,
            class_id: r.get(1)?,
            day_of_week: r.get(2)?,
            period_number: r.get(3)?,
            subject_code: r.get(4)?,
            subject_name: r.get(5)?,
            faculty_name: r.get(6)?,
            faculty_code: r.get(7)?,
            room_number: r.get(8)?,
            is_lab: r.get::<_, i64>(9)? != 0,
        })
    })?;
    rows.collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTime {
    pub period_number: u8,
    pub start_time: String,
    pub end_time: String,
}

impl PeriodTime {
    pub fn range(&self) -> String {
        format!("{} - {}", self.start_time, self.end_time)
    }
}

pub fn load_period_times(conn: &Connection) -> rusqlite::Result<Vec<PeriodTime>> {
    let mut stmt = conn.prepare(
        "SELECT period_number, start_time, end_time FROM period_times ORDER BY period_number",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(PeriodTime {
            period_number: r.get(0)?,
            start_time: r.get(1)?,
            end_time: r.get(2)?,
        })
    })?;
    rows.collect()
}

pub fn upsert_period_time(conn: &Connection, t: &PeriodTime) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO period_times(period_number, start_time, end_time) VALUES(?, ?, ?)
         ON CONFLICT(period_number) DO UPDATE SET
           start_time = excluded.start_time,
           end_time = excluded.end_time",
        (t.period_number, &t.start_time, &t.end_time),
    )?;
    Ok(())
}

pub fn insert_timetable_entry(conn: &Connection, e: &ValidatedEntry) -> rusqlite::Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO timetable(
            id, class_id, day_of_week, period_number, subject_code, subject_name,
            faculty_name, faculty_code, room_number, is_lab
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            id,
            e.class_id,
            e.day_of_week,
            e.period_number,
            e.subject_code,
            e.subject_name,
            e.faculty_name,
            e.faculty_code,
            e.room_number,
            e.is_lab as i64,
        ],
    )?;
    Ok(id)
}

pub fn insert_student(conn: &Connection, s: &ValidatedStudent) -> rusqlite::Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(
            id, roll_number, name, class_id, department_id, stream_id, status, email, phone
         ) VALUES(?, ?, ?, ?, ?, ?, 'active', ?, ?)",
        rusqlite::params![
            id,
            s.roll_number,
            s.name,
            s.class_id,
            s.department_id,
            s.stream_id,
            s.email,
            s.phone,
        ],
    )?;
    Ok(id)
}
