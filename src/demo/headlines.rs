//! Canned headlines fed to the demo producers

/// `"CATEGORY: Title"` paired with a body.
pub const HEADLINES: [(&str, &str); 22] = [
    (
        "BREAKING: Major Earthquake Strikes Tokyo",
        "A 7.3 magnitude quake disrupts transport and power across the city.",
    ),
    (
        "BREAKING: Global Markets Nosedive Amid Recession Fears",
        "Dow, FTSE, and Nikkei all fall sharply as investors react to new economic data.",
    ),
    (
        "BREAKING: Cyberattack Hits Major International Bank",
        "Hackers breach security, compromising millions of accounts worldwide.",
    ),
    (
        "POLITICS: U.S. Congress Passes Historic Climate Bill",
        "The legislation commits $500 billion to clean energy and emission cuts.",
    ),
    (
        "POLITICS: Coalition Government Formed in Pakistan",
        "Opposition parties join hands to replace the incumbent administration.",
    ),
    (
        "POLITICS: UK Prime Minister Survives No-Confidence Vote",
        "Despite mounting criticism, the PM secures enough support to remain in office.",
    ),
    (
        "SPORTS: Pakistan Stuns India in Last-Ball Thriller",
        "A six off the final delivery seals a dramatic T20 win at the Asia Cup.",
    ),
    (
        "SPORTS: Serena Williams Retires After Iconic Career",
        "The 23-time Grand Slam champion bids farewell after final match in New York.",
    ),
    (
        "SPORTS: Olympics 2028 Adds Esports to the Lineup",
        "Competitive video gaming officially joins the next Summer Games.",
    ),
    (
        "TECHNOLOGY: Apple Reveals First Foldable iPhone Prototype",
        "The sleek device folds seamlessly and is expected to launch by 2026.",
    ),
    (
        "TECHNOLOGY: OpenAI Releases GPT-5 With Multimodal Capabilities",
        "The model can now process video, audio, and text in real-time conversations.",
    ),
    (
        "TECHNOLOGY: Google Introduces Quantum AI Chip",
        "The chip claims to outperform classical supercomputers in speed and efficiency.",
    ),
    (
        "WEATHER: South Asia Faces Intense Heatwave",
        "Extreme temperatures above 45°C cause health warnings across the region.",
    ),
    (
        "WEATHER: Hurricane Alicia Nears U.S. Coastline",
        "The Category 4 storm is projected to hit Florida by early morning.",
    ),
    (
        "WEATHER: Dubai Hit by Record Rainfall and Flash Floods",
        "Unseasonal weather causes travel delays and infrastructure damage.",
    ),
    (
        "ENTERTAINMENT: Taylor Swift Breaks Spotify Streaming Records",
        "Her latest album crosses 1 billion plays in just 7 days.",
    ),
    (
        "ENTERTAINMENT: Deepika Padukone to Direct First Feature Film",
        "The actress steps into filmmaking with a psychological thriller project.",
    ),
    (
        "ENTERTAINMENT: House of the Dragon Renewed for Season 2",
        "HBO confirms the return after massive global success of Season 1.",
    ),
    (
        "ENTERTAINMENT: Cannes Film Festival Opens with Global Spotlight",
        "Stars from around the world arrive for the 78th edition of the prestigious event.",
    ),
    (
        "ENTERTAINMENT: Marvel Confirms Avengers: Secret Wars for 2027",
        "Fans celebrate as Marvel reveals its Phase 6 lineup at Comic-Con.",
    ),
    (
        "BREAKING: Major Power Outage Hits New York City",
        "A grid failure leaves over 2 million residents without electricity during peak hours.",
    ),
    (
        "POLITICS: UN Votes on Global Digital Privacy Agreement",
        "Nations agree on a new framework to protect user data across borders.",
    ),
];

/// Splits `"CATEGORY: Title"` into its parts. A headline without a prefix
/// yields `None` for the category.
pub fn split_headline(headline: &str) -> (Option<&str>, &str) {
    match headline.split_once(':') {
        Some((category, title)) => (Some(category.trim()), title.trim_start()),
        None => (None, headline),
    }
}
