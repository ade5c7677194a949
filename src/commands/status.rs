//! Status and clear command implementations

use crate::engine::{CourseAnalytics, RagEngine};
use crate::error::Result;

/// Gather catalog analytics
pub async fn cmd_status(engine: &RagEngine) -> Result<CourseAnalytics> {
    engine.analytics().await
}

/// Delete and recreate both collections
pub async fn cmd_clear(engine: &RagEngine) -> Result<()> {
    engine.index().clear_all_data().await
}

/// Print catalog analytics to console
pub fn print_status(analytics: &CourseAnalytics) {
    println!("\nIndex status:");
    println!("  Courses: {}", analytics.total_courses);
    println!("  Chunks: {}", analytics.total_chunks);

    if !analytics.course_titles.is_empty() {
        println!("\nCourses:");
        for title in &analytics.course_titles {
            println!("  - {title}");
        }
    }
}
