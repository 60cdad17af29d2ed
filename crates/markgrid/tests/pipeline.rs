//! End-to-end grading over synthetic sheet photos.

mod common;

use image::GrayImage;
use markgrid::{
    override_choice, summarize, AnswerKey, Grader, ItemFlag, Status, Template,
};

use common::sheet_photo;

#[test]
fn fully_marked_sheet_grades_against_a_key() {
    let template = Template::grid25();
    // Student marks choice (row % 5) on every row.
    let marks: Vec<(usize, usize)> = (0..25).map(|row| (row, row % 5)).collect();
    let photo = sheet_photo(&template, 1000, &marks);

    // Key agrees everywhere except rows 3 and 17.
    let key_choices: Vec<Option<usize>> = (0..25)
        .map(|row| {
            if row == 3 || row == 17 {
                Some((row + 1) % 5)
            } else {
                Some(row % 5)
            }
        })
        .collect();
    let key = AnswerKey::new(key_choices, vec![]);

    let grader = Grader::new(template).unwrap();
    let sheet = grader.grade("full.jpg", &photo, &key, None);

    assert_eq!(sheet.status, Status::Graded, "failure: {:?}", sheet.failure);
    assert!(sheet.items.iter().all(|i| i.flag == ItemFlag::Confident));
    assert_eq!(sheet.choice_tally.keyed, 25);
    assert_eq!(sheet.choice_tally.correct, 23);
    assert_eq!(sheet.choice_tally.wrong, 2);
}

#[test]
fn batch_with_one_bad_photo_reports_exactly_one_failure() {
    let template = Template::grid25();
    let key = AnswerKey::empty(25, 0);
    let grader = Grader::new(template.clone()).unwrap();

    let photos = vec![
        ("a.jpg".to_string(), sheet_photo(&template, 1000, &[(0, 0)])),
        (
            "b.jpg".to_string(),
            GrayImage::from_pixel(400, 566, image::Luma([common::PAPER])),
        ),
        ("c.jpg".to_string(), sheet_photo(&template, 1000, &[(1, 2)])),
    ];
    let results = grader.grade_batch(&photos, &key, None);

    let failed: Vec<_> = results
        .iter()
        .filter(|r| r.status == Status::FailedMarker)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].source, "b.jpg");
    assert!(failed[0].failure.is_some());

    let summary = summarize(&results, &key, 25);
    assert_eq!(summary.sheets, 3);
    assert_eq!(summary.failed, 1);
}

#[test]
fn review_override_promotes_sheet_to_graded() {
    let template = Template::grid25();
    // Leave row 10 unmarked so the sheet needs review.
    let marks: Vec<(usize, usize)> = (0..25).filter(|&r| r != 10).map(|r| (r, 0)).collect();
    let photo = sheet_photo(&template, 1000, &marks);
    let key = AnswerKey::new(vec![Some(0); 25], vec![]);

    let grader = Grader::new(template).unwrap();
    let sheet = grader.grade("partial.jpg", &photo, &key, None);
    assert_eq!(sheet.status, Status::NeedsReview);
    assert_eq!(sheet.items[10].flag, ItemFlag::Blank);
    assert_eq!(sheet.choice_tally.correct, 24);

    let sheet = override_choice(sheet, &key, 10, Some(0)).unwrap();
    assert_eq!(sheet.status, Status::Graded);
    assert_eq!(sheet.items[10].flag, ItemFlag::Manual);
    assert_eq!(sheet.choice_tally.correct, 25);
}

#[test]
fn rescaled_photo_grades_identically() {
    let template = Template::grid25();
    let marks = [(2usize, 3usize), (20, 1)];
    let key = AnswerKey::empty(25, 0);
    let grader = Grader::new(template.clone()).unwrap();

    for height in [800u32, 1400] {
        let photo = sheet_photo(&template, height, &marks);
        let sheet = grader.grade("scaled.jpg", &photo, &key, None);
        assert_ne!(sheet.status, Status::FailedMarker, "height {height}");
        for &(row, choice) in &marks {
            assert_eq!(sheet.items[row].choice, Some(choice), "height {height} row {row}");
        }
    }
}

#[test]
fn mixed_template_scores_choice_rows_and_exposes_free_rows() {
    let template = Template::mixed30();
    let marks: Vec<(usize, usize)> = (0..30).map(|r| (r, (r * 2) % 5)).collect();
    let photo = sheet_photo(&template, 1200, &marks);
    let key = AnswerKey::empty(30, 10);

    let grader = Grader::new(template).unwrap();
    let sheet = grader.grade("mixed.jpg", &photo, &key, None);

    assert_ne!(sheet.status, Status::FailedMarker, "failure: {:?}", sheet.failure);
    assert_eq!(sheet.items.len(), 30);
    assert_eq!(sheet.free.len(), 10);
    for &(row, choice) in &marks {
        assert_eq!(
            sheet.items[row].choice,
            Some(choice),
            "row {row}: scores {:?}",
            sheet.items[row].scores
        );
    }
}
