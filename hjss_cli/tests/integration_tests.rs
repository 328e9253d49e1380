//! Integration tests for the hjss binary.
//!
//! These tests verify end-to-end behavior including:
//! - Timetable generation
//! - Registration and the booking lifecycle
//! - Rule rejections surfacing as failures
//! - Reviews and monthly reports

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TODAY: &str = "2024-05-15";

// With --rotate around 2024-05-15 the first lessons are:
//   wed-17-04-2024-SLT1  Mason grade 1
//   wed-17-04-2024-SLT2  Ava   grade 2
//   wed-17-04-2024-SLT3  Liam  grade 3
//   fri-19-04-2024-SLT4  Zoe   grade 4
const GRADE_1: &str = "wed-17-04-2024-SLT1";
const GRADE_2: &str = "wed-17-04-2024-SLT2";
const GRADE_3: &str = "wed-17-04-2024-SLT3";
const GRADE_4: &str = "fri-19-04-2024-SLT4";

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// CLI bound to `data_dir`, with config lookups kept inside it too
fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("hjss"));
    cmd.env("XDG_CONFIG_HOME", data_dir)
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

fn init(data_dir: &Path) {
    cli(data_dir)
        .args(["init", "--rotate", "--today", TODAY])
        .assert()
        .success();
}

fn register(data_dir: &Path, name: &str, grade: u8) {
    cli(data_dir)
        .args(["register", "--name", name, "--gender", "female"])
        .args(["--dob", "2017-01-01", "--contact", "07123456789"])
        .args(["--grade", &grade.to_string(), "--today", TODAY])
        .assert()
        .success();
}

fn learner_id(n: usize) -> String {
    format!("HJSS-20170101-{:03}", n)
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("hjss"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Hatfield Junior Swimming School lesson booking",
        ));
}

#[test]
fn test_init_creates_timetable() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli(data_dir)
        .args(["init", "--rotate", "--today", TODAY])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created 69 lessons"))
        .stdout(predicate::str::contains("2024-04-17 to 2024-05-29"));

    assert!(data_dir.join("state.json").exists());

    cli(data_dir)
        .args(["timetable", "--grade", "1", "--day", "wed"])
        .assert()
        .success()
        .stdout(predicate::str::contains(GRADE_1))
        .stdout(predicate::str::contains("16:00 - 17:00"))
        .stdout(predicate::str::contains("Mason"))
        .stdout(predicate::str::contains(GRADE_2).not());
}

#[test]
fn test_init_refuses_to_overwrite() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);
    register(data_dir, "Ella", 1);

    cli(data_dir)
        .args(["init", "--today", TODAY])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    cli(data_dir)
        .arg("learners")
        .assert()
        .success()
        .stdout(predicate::str::contains(learner_id(0)));

    cli(data_dir)
        .args(["init", "--seed", "7", "--today", TODAY, "--force"])
        .assert()
        .success();

    cli(data_dir)
        .arg("learners")
        .assert()
        .success()
        .stdout(predicate::str::contains("No learners registered"));
}

#[test]
fn test_register_rejects_bad_input() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);

    cli(data_dir)
        .args(["register", "--name", "Zoe", "--gender", "female"])
        .args(["--dob", "2017-01-01", "--contact", "01234567890"])
        .args(["--grade", "2", "--today", TODAY])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid UK mobile number"));

    cli(data_dir)
        .args(["register", "--name", "Zoe", "--gender", "female"])
        .args(["--dob", "2021-01-01", "--contact", "07123456789"])
        .args(["--grade", "2", "--today", TODAY])
        .assert()
        .failure()
        .stderr(predicate::str::contains("aged 5 to 10"));

    cli(data_dir)
        .arg("learners")
        .assert()
        .success()
        .stdout(predicate::str::contains("No learners registered"));
}

#[test]
fn test_booking_lifecycle_with_promotion() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);
    register(data_dir, "Ella", 1);
    let learner = learner_id(0);

    cli(data_dir)
        .args(["book", &learner, GRADE_1])
        .assert()
        .success()
        .stdout(predicate::str::contains("BK-0001"));
    cli(data_dir)
        .args(["book", &learner, GRADE_2])
        .assert()
        .success()
        .stdout(predicate::str::contains("BK-0002"));

    cli(data_dir)
        .args(["attend", "BK-0002", "--rating", "5", "--review", "Great fun"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Promoted to grade 2"))
        .stdout(predicate::str::contains("Review recorded"));

    // Second attend changes nothing
    cli(data_dir)
        .args(["attend", "BK-0002"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already marked attended"));

    cli(data_dir)
        .args(["cancel", "BK-0001"])
        .assert()
        .success();

    cli(data_dir)
        .args(["bookings", "--learner", &learner, "--status", "cancelled"])
        .assert()
        .success()
        .stdout(predicate::str::contains("BK-0001"))
        .stdout(predicate::str::contains("BK-0002").not());

    cli(data_dir)
        .args(["bookings", "--status", "attended"])
        .assert()
        .success()
        .stdout(predicate::str::contains("BK-0002"))
        .stdout(predicate::str::contains("BK-0001").not());

    cli(data_dir)
        .arg("learners")
        .assert()
        .success()
        .stdout(predicate::str::contains("grade 2"))
        .stdout(predicate::str::contains("attended 1"))
        .stdout(predicate::str::contains("cancelled 1"));

    cli(data_dir)
        .args(["reviews", "--coach", "ava"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5/5"))
        .stdout(predicate::str::contains("Great fun"));
}

#[test]
fn test_change_moves_booking() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);
    register(data_dir, "Ella", 2);
    let learner = learner_id(0);

    cli(data_dir)
        .args(["book", &learner, GRADE_2])
        .assert()
        .success();
    cli(data_dir)
        .args(["change", "BK-0001", GRADE_3])
        .assert()
        .success();

    cli(data_dir)
        .args(["timetable", "--grade", "3", "--day", "wed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1/4"));
    cli(data_dir)
        .args(["bookings"])
        .assert()
        .success()
        .stdout(predicate::str::contains(GRADE_3))
        .stdout(predicate::str::contains("Booked"));
}

#[test]
fn test_rule_rejections() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);
    register(data_dir, "Ella", 1);
    let learner = learner_id(0);

    cli(data_dir)
        .args(["book", &learner, "mon-01-01-2024-SLT999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("LessonNotFound"));
    cli(data_dir)
        .args(["book", "HJSS-19990101-999", GRADE_1])
        .assert()
        .failure()
        .stderr(predicate::str::contains("LearnerNotFound"));
    cli(data_dir)
        .args(["book", &learner, GRADE_4])
        .assert()
        .failure()
        .stderr(predicate::str::contains("IneligibleGrade"));

    cli(data_dir)
        .args(["book", &learner, GRADE_1])
        .assert()
        .success();
    cli(data_dir)
        .args(["book", &learner, GRADE_1])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DuplicateBooking"));

    cli(data_dir)
        .args(["cancel", "BK-0001"])
        .assert()
        .success();
    cli(data_dir)
        .args(["cancel", "BK-0001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("InvalidTransition"));
    cli(data_dir)
        .args(["review", "BK-0001", "4", "Nice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("InvalidTransition"));
}

#[test]
fn test_lesson_fills_up() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);
    for name in ["Ava", "Ben", "Cal", "Dee", "Eve"] {
        register(data_dir, name, 1);
    }

    for n in 0..4 {
        cli(data_dir)
            .args(["book", &learner_id(n), GRADE_1])
            .assert()
            .success();
    }
    cli(data_dir)
        .args(["book", &learner_id(4), GRADE_1])
        .assert()
        .failure()
        .stderr(predicate::str::contains("LessonFull"));

    cli(data_dir)
        .args(["timetable", "--coach", "mason", "--grade", "1", "--day", "wed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4/4  Fully Booked"));

    // Deleting a booking hands its place to the waiting learner
    cli(data_dir)
        .args(["delete-booking", "BK-0002"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted BK-0002"));
    cli(data_dir)
        .args(["book", &learner_id(4), GRADE_1])
        .assert()
        .success()
        .stdout(predicate::str::contains("BK-0005"));
}

#[test]
fn test_monthly_reports_and_csv() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    init(data_dir);
    register(data_dir, "Ella", 1);
    register(data_dir, "Finn", 1);

    cli(data_dir)
        .args(["book", &learner_id(0), GRADE_1])
        .assert()
        .success();
    cli(data_dir)
        .args(["book", &learner_id(1), GRADE_1])
        .assert()
        .success();
    for (booking, rating) in [("BK-0001", "4"), ("BK-0002", "1")] {
        cli(data_dir)
            .args(["attend", booking])
            .assert()
            .success();
        cli(data_dir)
            .args(["review", booking, rating, "Splashy"])
            .assert()
            .success();
    }

    let coaches_csv = data_dir.join("reports/coaches.csv");
    cli(data_dir)
        .args(["report", "coaches", "--year", "2024", "--month", "4", "--csv"])
        .arg(&coaches_csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Mason    average 2.50 from 2 reviews"));
    let content = fs::read_to_string(&coaches_csv).unwrap();
    assert!(content.contains("coach,reviews,average_rating"));
    assert!(content.contains("Mason,2,2.50"));

    let learners_csv = data_dir.join("learners.csv");
    cli(data_dir)
        .args(["report", "learners", "--year", "2024", "--month", "4", "--csv"])
        .arg(&learners_csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("booked 0, cancelled 0, attended 1"));
    let content = fs::read_to_string(&learners_csv).unwrap();
    assert_eq!(content.lines().count(), 3);

    cli(data_dir)
        .args(["report", "coaches", "--year", "2024", "--month", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No reviews this month"));
    cli(data_dir)
        .args(["report", "coaches", "--year", "2024", "--month", "13"])
        .assert()
        .failure();
}
