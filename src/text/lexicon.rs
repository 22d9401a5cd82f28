//! Fixed word lists used by the heuristics
//!
//! Single-word entries match token prefixes, so a stem like "настро" covers
//! "настроить", "настройка" and so on. Entries containing a space match as
//! phrases at a word boundary.

/// Words ignored by keyword extraction
pub const STOPWORDS: &[&str] = &[
    // English
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "have", "how", "its", "may", "who", "why", "what", "when",
    "where", "which", "with", "this", "that", "these", "those", "from", "into", "your", "does",
    "did", "will", "would", "should", "could", "there", "their", "then", "than", "them", "they",
    "been", "being", "were", "about", "after", "before", "also", "just", "only", "some", "such",
    "each", "other", "more", "most", "very", "here", "much", "many", "use", "using",
    // Russian
    "как", "что", "это", "для", "где", "когда", "который", "которые", "если", "или", "его",
    "она", "они", "оно", "так", "там", "тут", "все", "всё", "еще", "ещё", "уже", "при", "над",
    "под", "без", "про", "через", "между", "чтобы", "только", "также", "тоже", "был", "была",
    "были", "быть", "есть", "нет", "мне", "меня", "вам", "вас", "нас", "наш", "ваш", "свой",
    "себя", "этот", "эта", "эти", "того", "чем", "кто", "почему", "зачем", "можно", "нужно",
    "очень", "может", "будет", "после", "перед", "потом",
];

/// Stems of domain/technical vocabulary
pub const TECHNICAL_TERMS: &[&str] = &[
    "api", "http", "url", "sql", "json", "xml", "server", "database", "config", "protocol",
    "driver", "script", "token", "password", "login", "browser", "network", "proxy", "cache",
    "firewall", "certificate", "encrypt", "backup", "deploy", "docker", "kernel", "compile",
    "сервер", "базы данных", "база данных", "настро", "конфигур", "протокол", "драйвер",
    "скрипт", "парол", "логин", "браузер", "прокси", "кэш", "сертификат", "шифр",
    "резервн", "развертыв", "компил", "интерфейс", "авториз", "аутентиф",
];

/// Hedging phrases that make an answer less clear
pub const AMBIGUOUS_PHRASES: &[&str] = &[
    "maybe", "perhaps", "possibly", "probably", "might", "sometimes", "it depends",
    "in some cases", "usually", "возможно", "может быть", "наверное", "вероятно", "иногда",
    "как правило", "в некоторых случаях", "зависит от",
];

/// Words signalling that something must happen first
pub const PREREQUISITE_CUES: &[&str] = &[
    "first", "before you", "prior to", "requires", "required", "you need", "make sure",
    "prerequisite", "сначала", "прежде", "перед тем", "необходимо", "требуется",
    "убедитесь", "нужно сначала",
];

/// Words signalling a natural next step
pub const FOLLOW_UP_CUES: &[&str] = &[
    "then", "next", "afterwards", "after that", "once", "finally", "затем", "далее",
    "после этого", "потом", "дальше", "следующ", "в завершение",
];

/// Opposite-meaning token pairs; matched as whole tokens
pub const ANTONYM_PAIRS: &[(&str, &str)] = &[
    ("yes", "no"),
    ("always", "never"),
    ("enable", "disable"),
    ("enabled", "disabled"),
    ("allow", "deny"),
    ("allowed", "forbidden"),
    ("true", "false"),
    ("possible", "impossible"),
    ("free", "paid"),
    ("да", "нет"),
    ("можно", "нельзя"),
    ("всегда", "никогда"),
    ("включить", "выключить"),
    ("включено", "выключено"),
    ("разрешено", "запрещено"),
    ("возможно", "невозможно"),
    ("бесплатно", "платно"),
];

/// Markers of casual register
pub const INFORMAL_MARKERS: &[&str] = &[
    "lol", "hey", "btw", "thx", "ok", "привет", "спс", "ок", "кстати", "короче",
];
