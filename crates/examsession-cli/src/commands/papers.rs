use examsession_core::{papers_for, ExamCategory};

pub fn run(exam: Option<ExamCategory>) -> Result<(), Box<dyn std::error::Error>> {
    let categories = match exam {
        Some(category) => vec![category],
        None => vec![ExamCategory::Prelims, ExamCategory::Mains],
    };

    let mut out = serde_json::Map::new();
    for category in categories {
        out.insert(
            category.as_str().to_string(),
            serde_json::to_value(papers_for(category))?,
        );
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::Value::Object(out))?
    );
    Ok(())
}
