//! Canonical country names for the upstream daily reports.
//! The upstream CSVs renamed, merged and re-spelled entities many times over
//! the dataset's history; everything here folds those variants onto the name
//! the current files use so one entity never splits into several series.

/// Maps a historical country/region spelling to its canonical name.
/// Unmapped input passes through unchanged. Pure lookup, safe to call from
/// any thread, and idempotent: no canonical output appears as a key.
pub fn canonicalize(raw: &str) -> &str {
    match raw {
        // City/SAR reports folded into the sovereign country.
        "Mainland China" => "China",
        "Hong Kong" | "Hong Kong SAR" => "China",
        "Macau" | "Macao SAR" => "China",

        // Overseas departments and territories folded into the parent state.
        "French Guiana" | "Guadeloupe" | "Martinique" | "Mayotte" | "Reunion"
        | "Saint Barthelemy" | "St. Martin" | "Saint Martin" => "France",
        "Channel Islands" | "Gibraltar" | "Cayman Islands" => "United Kingdom",
        "Aruba" | "Curacao" => "Netherlands",
        "Faroe Islands" | "Greenland" => "Denmark",
        "Guam" | "Puerto Rico" => "US",

        // Renames and diacritic-free historical synonyms.
        "UK" => "United Kingdom",
        "Czech Republic" => "Czechia",
        "Macedonia" => "North Macedonia",
        "Swaziland" | "Kingdom of Eswatini" => "Eswatini",
        "Ivory Coast" => "Cote d'Ivoire",
        "Cape Verde" => "Cabo Verde",
        "East Timor" => "Timor-Leste",
        "The Bahamas" | "Bahamas, The" => "Bahamas",
        "The Gambia" | "Gambia, The" => "Gambia",
        "South Korea" | "Republic of Korea" => "Korea, South",
        "Iran (Islamic Republic of)" => "Iran",
        "Russian Federation" => "Russia",
        "Viet Nam" => "Vietnam",
        "Republic of Moldova" => "Moldova",
        "Republic of the Congo" => "Congo (Brazzaville)",

        // Disambiguation singletons, looked up by exact historical value.
        "Taipei and environs" | "Taiwan" => "Taiwan*",
        "occupied Palestinian territory" | "Palestine" => "West Bank and Gaza",
        "Vatican City" => "Holy See",
        "Cruise Ship" | "Others" => "Diamond Princess",

        _ => raw,
    }
}
