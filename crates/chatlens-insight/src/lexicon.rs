//! Word polarity tables for the lexical classifier.
//!
//! Valences are on a -1.0..=1.0 scale. Entries are lowercase.

pub(crate) const POLARITY: &[(&str, f64)] = &[
    // Positive
    ("good", 0.6),
    ("great", 0.8),
    ("excellent", 0.9),
    ("amazing", 0.9),
    ("awesome", 0.9),
    ("fantastic", 0.9),
    ("wonderful", 0.9),
    ("brilliant", 0.8),
    ("perfect", 1.0),
    ("nice", 0.5),
    ("fine", 0.3),
    ("ok", 0.1),
    ("okay", 0.1),
    ("cool", 0.4),
    ("love", 0.8),
    ("loved", 0.8),
    ("loving", 0.7),
    ("like", 0.4),
    ("liked", 0.4),
    ("enjoy", 0.6),
    ("enjoyed", 0.6),
    ("happy", 0.8),
    ("glad", 0.6),
    ("pleased", 0.6),
    ("delighted", 0.9),
    ("excited", 0.7),
    ("thanks", 0.5),
    ("thank", 0.5),
    ("grateful", 0.7),
    ("beautiful", 0.8),
    ("best", 0.9),
    ("better", 0.5),
    ("helpful", 0.6),
    ("useful", 0.5),
    ("easy", 0.4),
    ("fun", 0.6),
    ("funny", 0.5),
    ("interesting", 0.4),
    ("impressive", 0.7),
    ("recommend", 0.5),
    ("success", 0.7),
    ("successful", 0.7),
    ("win", 0.6),
    ("won", 0.6),
    ("yes", 0.2),
    ("kind", 0.5),
    ("friendly", 0.6),
    ("calm", 0.3),
    ("comfortable", 0.5),
    ("fast", 0.3),
    ("clean", 0.3),
    ("correct", 0.4),
    ("right", 0.2),
    ("smart", 0.6),
    ("sweet", 0.6),
    ("hope", 0.3),
    ("hopeful", 0.5),
    ("proud", 0.6),
    ("relieved", 0.5),
    ("satisfied", 0.6),
    ("superb", 0.9),
    ("terrific", 0.8),
    ("wow", 0.6),
    // Negative
    ("bad", -0.6),
    ("terrible", -0.9),
    ("awful", -0.9),
    ("horrible", -0.9),
    ("worst", -1.0),
    ("worse", -0.6),
    ("poor", -0.5),
    ("hate", -0.9),
    ("hated", -0.9),
    ("dislike", -0.5),
    ("sad", -0.6),
    ("unhappy", -0.7),
    ("angry", -0.8),
    ("annoyed", -0.6),
    ("annoying", -0.6),
    ("upset", -0.6),
    ("disappointed", -0.7),
    ("disappointing", -0.7),
    ("frustrated", -0.7),
    ("frustrating", -0.7),
    ("boring", -0.5),
    ("broken", -0.6),
    ("bug", -0.4),
    ("crash", -0.6),
    ("error", -0.4),
    ("fail", -0.7),
    ("failed", -0.7),
    ("failure", -0.7),
    ("problem", -0.4),
    ("issue", -0.3),
    ("wrong", -0.5),
    ("slow", -0.4),
    ("hard", -0.2),
    ("difficult", -0.4),
    ("useless", -0.8),
    ("ugly", -0.7),
    ("stupid", -0.8),
    ("dumb", -0.7),
    ("pain", -0.6),
    ("painful", -0.7),
    ("hurt", -0.6),
    ("sick", -0.5),
    ("tired", -0.4),
    ("worried", -0.5),
    ("scared", -0.6),
    ("afraid", -0.6),
    ("lost", -0.4),
    ("lonely", -0.6),
    ("sorry", -0.3),
    ("miss", -0.3),
    ("mess", -0.5),
    ("disgusting", -0.9),
    ("waste", -0.6),
    ("unfortunately", -0.4),
    ("sucks", -0.8),
];

/// Words that scale the polarity of the following polar word.
pub(crate) const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.5),
    ("really", 1.4),
    ("so", 1.3),
    ("extremely", 2.0),
    ("incredibly", 1.8),
    ("super", 1.5),
    ("totally", 1.4),
    ("absolutely", 1.8),
    ("quite", 1.2),
    ("too", 1.3),
];

/// Ceiling on the combined multiplier of a run of intensifiers.
pub(crate) const MAX_BOOST: f64 = 4.0;

/// Words that flip and dampen the following polar word.
pub(crate) const NEGATORS: &[&str] = &[
    "not", "no", "never", "don't", "dont", "doesn't", "doesnt", "didn't", "didnt", "isn't",
    "isnt", "wasn't", "wasnt", "aren't", "arent", "can't", "cant", "won't", "wont", "cannot",
    "hardly", "nothing",
];

/// Multiplier applied to a polar word preceded by a negator.
pub(crate) const NEGATION_FACTOR: f64 = -0.5;
