use super::Badge;

/// The fixed badge catalog seeded into storage.
pub fn badge_catalog() -> Vec<Badge> {
    fn badge(
        key: &str,
        name_de: &str,
        name_en: &str,
        description_de: &str,
        description_en: &str,
        icon: &str,
    ) -> Badge {
        Badge {
            key: key.to_string(),
            name_de: name_de.to_string(),
            name_en: name_en.to_string(),
            description_de: description_de.to_string(),
            description_en: description_en.to_string(),
            icon: Some(icon.to_string()),
        }
    }

    vec![
        badge(
            "erste_100",
            "Erste 100",
            "First 100",
            "100 richtige Antworten gesamt",
            "100 correct answers total",
            "🏁",
        ),
        badge(
            "konsequent",
            "Konsequent",
            "Consistent",
            "7 Tage Daily-Streak",
            "7-day daily streak",
            "🔥",
        ),
        badge(
            "pruefungssicher",
            "Prüfungssicher",
            "Exam Ready",
            "3 Prüfungen ≥ 80%",
            "3 exams ≥ 80%",
            "🎯",
        ),
        badge(
            "leitner_meister",
            "Leitner-Meister",
            "Leitner Master",
            "50 Fragen in Box 5",
            "50 questions in box 5",
            "📚",
        ),
        badge(
            "erste_1000",
            "Wissensbasis",
            "Knowledge Base",
            "1000 richtige Antworten",
            "1000 correct answers",
            "🧠",
        ),
        badge(
            "marathon",
            "Marathon",
            "Marathon",
            "30 Tage Daily-Streak",
            "30-day daily streak",
            "🏃",
        ),
        badge(
            "perfektionist",
            "Perfektionist",
            "Perfectionist",
            "Eine Prüfung mit 100%",
            "One exam with 100%",
            "💯",
        ),
        badge(
            "duellant",
            "Duellant",
            "Duelist",
            "10 Duelle gespielt",
            "10 duels played",
            "⚔️",
        ),
        badge(
            "unbesiegbar",
            "Unbesiegbar",
            "Unbeatable",
            "5 Duelle in Folge gewonnen",
            "5 duels won in a row",
            "🛡️",
        ),
        badge(
            "sozial",
            "Teamplayer",
            "Social",
            "5 verschiedene Gegner herausgefordert",
            "Challenged 5 different opponents",
            "🤝",
        ),
    ]
}
