pub mod survey;

pub use survey::{
    CellValue, Manufacturer, PickQuestion, SubmissionRecord, SurveyForm, ValidSubmission,
    PICK_QUESTIONS, SHEET_HEADERS,
};
