pub const STUDENTS_TEMPLATE_FILE: &str = "student_import_template.csv";
pub const TIMETABLE_TEMPLATE_FILE: &str = "timetable_template.csv";

pub const STUDENTS_TEMPLATE: &str = "roll_number,name,department,class\n\
CS001,John Doe,Computer Science,I YR CSE-A\n\
CS002,Jane Smith,CS,I YR CSE-A\n";

pub const TIMETABLE_TEMPLATE: &str =
    "class,day_of_week,period_number,subject_code,subject_name,faculty_name,faculty_code,is_lab\n\
II CSE A,Monday,1,CA(302),Computer Architecture,MRS. ROSHINI,RO,No\n\
II CSE A,Monday,2,DS(303),Data Structures,MR. KUMAR,KU,No\n\
II CSE A,Monday,3,DBMS(304),Database Management,MS. PRIYA,PR,No\n\
II CSE A,Tuesday,1,DS LAB,Data Structures Lab,MR. KUMAR,KU,Yes\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::fields::{FieldIndex, ImportRow, STUDENT_FIELDS, TIMETABLE_FIELDS};
    use crate::import::table::parse_csv_text;

    #[test]
    fn templates_carry_every_required_column() {
        let t = parse_csv_text(STUDENTS_TEMPLATE).expect("students template");
        assert!(FieldIndex::for_table(&t, STUDENT_FIELDS)
            .missing_columns()
            .is_empty());
        assert_eq!(t.rows.len(), 2);

        let t = parse_csv_text(TIMETABLE_TEMPLATE).expect("timetable template");
        let idx = FieldIndex::for_table(&t, TIMETABLE_FIELDS);
        assert!(idx.missing_columns().is_empty());
        let lab = ImportRow::from_csv_row(&idx, &t.rows[3]).expect("lab row");
        assert!(lab.is_lab);
        let theory = ImportRow::from_csv_row(&idx, &t.rows[0]).expect("theory row");
        assert!(!theory.is_lab);
    }
}
