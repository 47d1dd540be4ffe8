use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;
use windward_db::recommendation::NewRecommendation;
use windward_entity::catalog::{course, lesson};
use windward_entity::recommendation::ContentKind;
use windward_irt::{CefrLevel, ProficiencyRange};
use windward_model::result::SkillScore;

#[derive(Debug, Clone, Copy)]
pub struct RecommendationSettings {
    pub courses_per_skill: usize,
    pub lessons_per_course: usize,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            courses_per_skill: 2,
            lessons_per_course: 2,
        }
    }
}

/// A course chosen for one weak skill, before lesson fill-in.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCourse {
    pub course_id: Uuid,
    pub skill: String,
    pub gap: f64,
    pub target: CefrLevel,
}

/// Rank skills by gap against the target band (one band above the overall
/// level, capped at C2) and pick up to N courses per weak skill. Candidate
/// courses must sit at the student's band or one above and have their
/// prerequisites met by the measured skill levels.
pub fn plan_courses(
    skill_scores: &BTreeMap<String, SkillScore>,
    overall: CefrLevel,
    range: &ProficiencyRange,
    courses: &[course::Model],
    settings: &RecommendationSettings,
) -> Vec<PlannedCourse> {
    let target = overall.next();
    let target_midpoint = range.midpoint(target);

    let mut gaps: Vec<(&String, f64)> = skill_scores
        .iter()
        .map(|(skill, score)| (skill, target_midpoint - score.theta))
        .filter(|(_, gap)| *gap > 0.0)
        .collect();
    gaps.sort_by(|(skill_a, gap_a), (skill_b, gap_b)| {
        gap_b
            .partial_cmp(gap_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| skill_a.cmp(skill_b))
    });

    let mut planned = Vec::new();
    for (skill, gap) in gaps {
        let picked = courses
            .iter()
            .filter(|course| course.primary_skill == *skill)
            .filter(|course| course_level_fits(course, overall, target))
            .filter(|course| prerequisites_met(course, skill_scores))
            .take(settings.courses_per_skill);
        for course in picked {
            planned.push(PlannedCourse {
                course_id: course.id,
                skill: skill.clone(),
                gap,
                target,
            });
        }
    }
    planned
}

fn course_level_fits(course: &course::Model, current: CefrLevel, target: CefrLevel) -> bool {
    match CefrLevel::from_str(&course.target_cefr) {
        Ok(level) => level == current || level == target,
        Err(_) => false,
    }
}

fn prerequisites_met(course: &course::Model, skill_scores: &BTreeMap<String, SkillScore>) -> bool {
    course.prerequisites().iter().all(|(skill, required)| {
        let Ok(required) = CefrLevel::from_str(required) else {
            return false;
        };
        skill_scores.get(skill).is_some_and(|score| score.cefr >= required)
    })
}

/// Turn the course plan into ordered rows, appending up to M lessons that
/// exercise the weak skill after each course. `priority_order` is assigned
/// 1..k in emission order.
pub fn assemble_rows(
    planned: &[PlannedCourse],
    lessons_by_course: &BTreeMap<Uuid, Vec<lesson::Model>>,
    settings: &RecommendationSettings,
) -> Vec<NewRecommendation> {
    let mut rows = Vec::new();
    for course in planned {
        rows.push(NewRecommendation {
            content_id: course.course_id,
            content_kind: ContentKind::Course,
            target_skill: course.skill.clone(),
            skill_gap_size: Some(course.gap),
            rationale: Some(rationale(&course.skill, course.gap, course.target)),
            priority_order: 0,
        });
        if let Some(lessons) = lessons_by_course.get(&course.course_id) {
            for lesson in lessons
                .iter()
                .filter(|lesson| lesson.target_skills().contains(&course.skill))
                .take(settings.lessons_per_course)
            {
                rows.push(NewRecommendation {
                    content_id: lesson.id,
                    content_kind: ContentKind::Lesson,
                    target_skill: course.skill.clone(),
                    skill_gap_size: Some(course.gap),
                    rationale: Some(rationale(&course.skill, course.gap, course.target)),
                    priority_order: 0,
                });
            }
        }
    }
    for (index, row) in rows.iter_mut().enumerate() {
        row.priority_order = index as i32 + 1;
    }
    rows
}

fn rationale(skill: &str, gap: f64, target: CefrLevel) -> String {
    format!("Builds {skill} toward {target}; estimated gap {gap:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn score(theta: f64, cefr: CefrLevel) -> SkillScore {
        SkillScore {
            theta,
            standard_error: Some(0.3),
            cefr,
        }
    }

    fn course(id: u128, skill: &str, level: &str, difficulty_order: i32) -> course::Model {
        course::Model {
            id: Uuid::from_u128(id),
            pathway_id: Uuid::from_u128(999),
            title: format!("{skill} {id}"),
            description: None,
            target_cefr: level.to_owned(),
            primary_skill: skill.to_owned(),
            secondary_skills: json!([]),
            difficulty_order,
            prerequisites: json!({}),
            active: true,
            created_at: Utc::now(),
        }
    }

    fn lesson(id: u128, course_id: u128, skills: &[&str]) -> lesson::Model {
        lesson::Model {
            id: Uuid::from_u128(id),
            course_id: Uuid::from_u128(course_id),
            title: format!("lesson {id}"),
            lesson_order: id as i32,
            target_skills: json!(skills),
            active: true,
            created_at: Utc::now(),
        }
    }

    fn b1_scores() -> BTreeMap<String, SkillScore> {
        BTreeMap::from([
            ("grammar".to_owned(), score(-0.5, CefrLevel::A2)),
            ("vocabulary".to_owned(), score(0.8, CefrLevel::B1)),
            ("reading".to_owned(), score(0.2, CefrLevel::B1)),
        ])
    }

    #[test]
    fn ranks_largest_gap_first() {
        let courses = vec![
            course(1, "grammar", "B2", 1),
            course(2, "vocabulary", "B2", 1),
            course(3, "reading", "B2", 1),
        ];
        let planned = plan_courses(
            &b1_scores(),
            CefrLevel::B1,
            &ProficiencyRange::default(),
            &courses,
            &RecommendationSettings::default(),
        );
        let skills: Vec<&str> = planned.iter().map(|p| p.skill.as_str()).collect();
        assert_eq!(skills, vec!["grammar", "reading", "vocabulary"]);
        assert!(planned[0].gap > planned[1].gap);
        assert!(planned[1].gap > planned[2].gap);
    }

    #[test]
    fn skills_at_or_above_target_are_strengths() {
        let scores = BTreeMap::from([("listening".to_owned(), score(2.0, CefrLevel::C1))]);
        let planned = plan_courses(
            &scores,
            CefrLevel::B1,
            &ProficiencyRange::default(),
            &[course(1, "listening", "B2", 1)],
            &RecommendationSettings::default(),
        );
        assert!(planned.is_empty());
    }

    #[test]
    fn filters_courses_outside_the_band_window() {
        let courses = vec![
            course(1, "grammar", "A1", 1),
            course(2, "grammar", "B1", 2),
            course(3, "grammar", "C2", 3),
        ];
        let planned = plan_courses(
            &b1_scores(),
            CefrLevel::B1,
            &ProficiencyRange::default(),
            &courses,
            &RecommendationSettings::default(),
        );
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].course_id, Uuid::from_u128(2));
    }

    #[test]
    fn unsatisfied_prerequisites_exclude_a_course() {
        let mut gated = course(1, "grammar", "B1", 1);
        gated.prerequisites = json!({"reading": "C1"});
        let open = course(2, "grammar", "B1", 2);
        let planned = plan_courses(
            &b1_scores(),
            CefrLevel::B1,
            &ProficiencyRange::default(),
            &[gated, open],
            &RecommendationSettings::default(),
        );
        assert_eq!(planned.iter().map(|p| p.course_id).collect::<Vec<_>>(), vec![
            Uuid::from_u128(2)
        ]);
    }

    #[test]
    fn caps_courses_per_skill() {
        let courses = vec![
            course(1, "grammar", "B1", 1),
            course(2, "grammar", "B1", 2),
            course(3, "grammar", "B1", 3),
        ];
        let planned = plan_courses(
            &b1_scores(),
            CefrLevel::B1,
            &ProficiencyRange::default(),
            &courses,
            &RecommendationSettings::default(),
        );
        assert_eq!(planned.iter().filter(|p| p.skill == "grammar").count(), 2);
    }

    #[test]
    fn assembles_rows_with_lesson_fill_and_priorities() {
        let planned = vec![
            PlannedCourse {
                course_id: Uuid::from_u128(1),
                skill: "grammar".to_owned(),
                gap: 2.0,
                target: CefrLevel::B2,
            },
            PlannedCourse {
                course_id: Uuid::from_u128(2),
                skill: "reading".to_owned(),
                gap: 1.3,
                target: CefrLevel::B2,
            },
        ];
        let lessons = BTreeMap::from([
            (Uuid::from_u128(1), vec![
                lesson(10, 1, &["grammar"]),
                lesson(11, 1, &["listening"]),
                lesson(12, 1, &["grammar"]),
                lesson(13, 1, &["grammar"]),
            ]),
            (Uuid::from_u128(2), vec![]),
        ]);
        let rows = assemble_rows(&planned, &lessons, &RecommendationSettings::default());

        // Course 1, two grammar lessons (capped), then course 2.
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].content_kind, ContentKind::Course);
        assert_eq!(rows[1].content_id, Uuid::from_u128(10));
        assert_eq!(rows[2].content_id, Uuid::from_u128(12));
        assert_eq!(rows[3].content_id, Uuid::from_u128(2));
        let priorities: Vec<i32> = rows.iter().map(|row| row.priority_order).collect();
        assert_eq!(priorities, vec![1, 2, 3, 4]);
    }
}
