use lazy_static::lazy_static;
use std::collections::HashMap;

use super::Scheme;

/// Scheme-independent sound unit. Indices follow the traditional varṇamālā order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Vowel(u8),
    Consonant(u8),
    Anusvara,
    Visarga,
    Candrabindu,
    Avagraha,
    Om,
    Danda,
    DoubleDanda,
    Digit(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Unit(Unit),
    /// Anything outside the scheme's alphabet, passed through untouched
    Raw(char),
}

const VOWEL_COUNT: usize = 14;
const CONSONANT_COUNT: usize = 33;

/// Alias lists per unit; the first alias is the one emitted.
struct RomanTable {
    vowels: [&'static [&'static str]; VOWEL_COUNT],
    consonants: [&'static [&'static str]; CONSONANT_COUNT],
    anusvara: &'static [&'static str],
    visarga: &'static [&'static str],
    candrabindu: &'static [&'static str],
    avagraha: &'static [&'static str],
    om: &'static [&'static str],
    /// Multi-unit spellings such as ITRANS `x` for k+ṣ
    clusters: &'static [(&'static str, &'static [Unit])],
    lowercase_input: bool,
}

const KA: u8 = 0;
const JA: u8 = 7;
const NYA: u8 = 9;
const SSA: u8 = 30;

const ITRANS: RomanTable = RomanTable {
    vowels: [
        &["a"],
        &["A", "aa"],
        &["i"],
        &["I", "ii"],
        &["u"],
        &["U", "uu"],
        &["RRi", "R^i"],
        &["RRI", "R^I"],
        &["LLi", "L^i"],
        &["LLI", "L^I"],
        &["e"],
        &["ai"],
        &["o"],
        &["au"],
    ],
    consonants: [
        &["k"], &["kh"], &["g"], &["gh"], &["~N", "N^"],
        &["ch", "c"], &["Ch", "chh"], &["j"], &["jh"], &["~n", "JN"],
        &["T"], &["Th"], &["D"], &["Dh"], &["N"],
        &["t"], &["th"], &["d"], &["dh"], &["n"],
        &["p"], &["ph"], &["b"], &["bh"], &["m"],
        &["y"], &["r"], &["l"], &["v", "w"],
        &["sh"], &["Sh", "shh"], &["s"], &["h"],
    ],
    anusvara: &["M", ".n", ".m"],
    visarga: &["H"],
    candrabindu: &[".N"],
    avagraha: &[".a"],
    om: &["OM", "AUM"],
    clusters: &[
        ("x", &[Unit::Consonant(KA), Unit::Consonant(SSA)]),
        ("kSh", &[Unit::Consonant(KA), Unit::Consonant(SSA)]),
        ("GY", &[Unit::Consonant(JA), Unit::Consonant(NYA)]),
        ("j~n", &[Unit::Consonant(JA), Unit::Consonant(NYA)]),
        ("dny", &[Unit::Consonant(JA), Unit::Consonant(NYA)]),
    ],
    lowercase_input: false,
};

const IAST: RomanTable = RomanTable {
    vowels: [
        &["a"],
        &["ā"],
        &["i"],
        &["ī"],
        &["u"],
        &["ū"],
        &["ṛ"],
        &["ṝ"],
        &["ḷ"],
        &["ḹ"],
        &["e"],
        &["ai"],
        &["o"],
        &["au"],
    ],
    consonants: [
        &["k"], &["kh"], &["g"], &["gh"], &["ṅ"],
        &["c"], &["ch"], &["j"], &["jh"], &["ñ"],
        &["ṭ"], &["ṭh"], &["ḍ"], &["ḍh"], &["ṇ"],
        &["t"], &["th"], &["d"], &["dh"], &["n"],
        &["p"], &["ph"], &["b"], &["bh"], &["m"],
        &["y"], &["r"], &["l"], &["v"],
        &["ś"], &["ṣ"], &["s"], &["h"],
    ],
    anusvara: &["ṃ", "ṁ"],
    visarga: &["ḥ"],
    candrabindu: &["m̐"],
    avagraha: &["'"],
    om: &[],
    clusters: &[],
    lowercase_input: true,
};

const HARVARD_KYOTO: RomanTable = RomanTable {
    vowels: [
        &["a"],
        &["A"],
        &["i"],
        &["I"],
        &["u"],
        &["U"],
        &["R"],
        &["RR"],
        &["lR"],
        &["lRR"],
        &["e"],
        &["ai"],
        &["o"],
        &["au"],
    ],
    consonants: [
        &["k"], &["kh"], &["g"], &["gh"], &["G"],
        &["c"], &["ch"], &["j"], &["jh"], &["J"],
        &["T"], &["Th"], &["D"], &["Dh"], &["N"],
        &["t"], &["th"], &["d"], &["dh"], &["n"],
        &["p"], &["ph"], &["b"], &["bh"], &["m"],
        &["y"], &["r"], &["l"], &["v"],
        &["z"], &["S"], &["s"], &["h"],
    ],
    anusvara: &["M"],
    visarga: &["H"],
    candrabindu: &["~"],
    avagraha: &["'"],
    om: &["OM"],
    clusters: &[],
    lowercase_input: false,
};

const SLP1: RomanTable = RomanTable {
    vowels: [
        &["a"],
        &["A"],
        &["i"],
        &["I"],
        &["u"],
        &["U"],
        &["f"],
        &["F"],
        &["x"],
        &["X"],
        &["e"],
        &["E"],
        &["o"],
        &["O"],
    ],
    consonants: [
        &["k"], &["K"], &["g"], &["G"], &["N"],
        &["c"], &["C"], &["j"], &["J"], &["Y"],
        &["w"], &["W"], &["q"], &["Q"], &["R"],
        &["t"], &["T"], &["d"], &["D"], &["n"],
        &["p"], &["P"], &["b"], &["B"], &["m"],
        &["y"], &["r"], &["l"], &["v"],
        &["S"], &["z"], &["s"], &["h"],
    ],
    anusvara: &["M"],
    visarga: &["H"],
    candrabindu: &["~"],
    avagraha: &["'"],
    om: &[],
    clusters: &[],
    lowercase_input: false,
};

const DEV_VOWELS: [char; VOWEL_COUNT] = [
    'अ', 'आ', 'इ', 'ई', 'उ', 'ऊ', 'ऋ', 'ॠ', 'ऌ', 'ॡ', 'ए', 'ऐ', 'ओ', 'औ',
];

/// Dependent vowel signs; the inherent `a` has none.
const DEV_MATRAS: [Option<char>; VOWEL_COUNT] = [
    None,
    Some('ा'),
    Some('ि'),
    Some('ी'),
    Some('ु'),
    Some('ू'),
    Some('ृ'),
    Some('ॄ'),
    Some('ॢ'),
    Some('ॣ'),
    Some('े'),
    Some('ै'),
    Some('ो'),
    Some('ौ'),
];

const DEV_CONSONANTS: [char; CONSONANT_COUNT] = [
    'क', 'ख', 'ग', 'घ', 'ङ', 'च', 'छ', 'ज', 'झ', 'ञ', 'ट', 'ठ', 'ड', 'ढ', 'ण', 'त', 'थ',
    'द', 'ध', 'न', 'प', 'फ', 'ब', 'भ', 'म', 'य', 'र', 'ल', 'व', 'श', 'ष', 'स', 'ह',
];

const VIRAMA: char = '्';
const NUKTA: char = '़';
const ANUSVARA: char = 'ं';
const VISARGA: char = 'ः';
const CANDRABINDU: char = 'ँ';
const AVAGRAHA: char = 'ऽ';
const OM: char = 'ॐ';
const DANDA: char = '।';
const DOUBLE_DANDA: char = '॥';
const DEV_ZERO: u32 = 0x0966;

/// Lookup built once per roman scheme: spelling -> units
struct RomanParser {
    table: &'static RomanTable,
    spellings: HashMap<String, Vec<Unit>>,
    max_len: usize,
}

impl RomanParser {
    fn new(table: &'static RomanTable) -> Self {
        let mut spellings: HashMap<String, Vec<Unit>> = HashMap::new();
        let mut add = |aliases: &[&str], units: Vec<Unit>| {
            for alias in aliases {
                spellings.entry(alias.to_string()).or_insert_with(|| units.clone());
            }
        };

        for (idx, aliases) in table.vowels.iter().enumerate() {
            add(*aliases, vec![Unit::Vowel(idx as u8)]);
        }
        for (idx, aliases) in table.consonants.iter().enumerate() {
            add(*aliases, vec![Unit::Consonant(idx as u8)]);
        }
        add(table.anusvara, vec![Unit::Anusvara]);
        add(table.visarga, vec![Unit::Visarga]);
        add(table.candrabindu, vec![Unit::Candrabindu]);
        add(table.avagraha, vec![Unit::Avagraha]);
        add(table.om, vec![Unit::Om]);
        add(&["||"], vec![Unit::DoubleDanda]);
        add(&["|"], vec![Unit::Danda]);
        for (spelling, units) in table.clusters {
            add(&[*spelling], units.to_vec());
        }

        let max_len = spellings.keys().map(|s| s.chars().count()).max().unwrap_or(1);

        Self {
            table,
            spellings,
            max_len,
        }
    }

    fn parse(&self, text: &str) -> Vec<Token> {
        let chars: Vec<char> = if self.table.lowercase_input {
            text.chars().flat_map(|c| c.to_lowercase()).collect()
        } else {
            text.chars().collect()
        };

        let mut tokens = Vec::with_capacity(chars.len());
        let mut pos = 0;

        'outer: while pos < chars.len() {
            let longest = self.max_len.min(chars.len() - pos);
            for len in (1..=longest).rev() {
                let candidate: String = chars[pos..pos + len].iter().collect();
                if let Some(units) = self.spellings.get(&candidate) {
                    tokens.extend(units.iter().map(|u| Token::Unit(*u)));
                    pos += len;
                    continue 'outer;
                }
            }

            let ch = chars[pos];
            match ch.to_digit(10) {
                Some(d) if ch.is_ascii_digit() => tokens.push(Token::Unit(Unit::Digit(d as u8))),
                _ => tokens.push(Token::Raw(ch)),
            }
            pos += 1;
        }

        tokens
    }

    fn render(&self, tokens: &[Token]) -> String {
        let mut out = String::with_capacity(tokens.len() * 2);
        for token in tokens {
            match token {
                Token::Raw(c) => out.push(*c),
                Token::Unit(unit) => self.render_unit(*unit, &mut out),
            }
        }
        out
    }

    fn render_unit(&self, unit: Unit, out: &mut String) {
        let table = self.table;
        match unit {
            Unit::Vowel(i) => out.push_str(table.vowels[i as usize][0]),
            Unit::Consonant(i) => out.push_str(table.consonants[i as usize][0]),
            Unit::Anusvara => out.push_str(table.anusvara[0]),
            Unit::Visarga => out.push_str(table.visarga[0]),
            Unit::Candrabindu => out.push_str(table.candrabindu[0]),
            Unit::Avagraha => out.push_str(table.avagraha[0]),
            Unit::Om => match table.om.first() {
                Some(om) => out.push_str(om),
                None => {
                    out.push_str(table.vowels[12][0]);
                    out.push_str(table.anusvara[0]);
                }
            },
            Unit::Danda => out.push('|'),
            Unit::DoubleDanda => out.push_str("||"),
            Unit::Digit(d) => out.push(char::from(b'0' + d)),
        }
    }
}

lazy_static! {
    static ref ITRANS_PARSER: RomanParser = RomanParser::new(&ITRANS);
    static ref IAST_PARSER: RomanParser = RomanParser::new(&IAST);
    static ref HK_PARSER: RomanParser = RomanParser::new(&HARVARD_KYOTO);
    static ref SLP1_PARSER: RomanParser = RomanParser::new(&SLP1);
}

fn roman_parser(scheme: Scheme) -> Option<&'static RomanParser> {
    match scheme {
        Scheme::Itrans => Some(&ITRANS_PARSER),
        Scheme::Iast => Some(&IAST_PARSER),
        Scheme::HarvardKyoto => Some(&HK_PARSER),
        Scheme::Slp1 => Some(&SLP1_PARSER),
        Scheme::Devanagari => None,
    }
}

pub fn parse(text: &str, scheme: Scheme) -> Vec<Token> {
    match roman_parser(scheme) {
        Some(parser) => parser.parse(text),
        None => parse_devanagari(text),
    }
}

pub fn render(tokens: &[Token], scheme: Scheme) -> String {
    match roman_parser(scheme) {
        Some(parser) => parser.render(tokens),
        None => render_devanagari(tokens),
    }
}

fn parse_devanagari(text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len() * 2);
    let mut pos = 0;

    while pos < chars.len() {
        let ch = chars[pos];
        pos += 1;

        if let Some(idx) = DEV_CONSONANTS.iter().position(|&c| c == ch) {
            tokens.push(Token::Unit(Unit::Consonant(idx as u8)));
            while pos < chars.len() && chars[pos] == NUKTA {
                pos += 1;
            }
            match chars.get(pos) {
                Some(&VIRAMA) => pos += 1,
                Some(next) => match DEV_MATRAS.iter().position(|m| *m == Some(*next)) {
                    Some(vowel) => {
                        tokens.push(Token::Unit(Unit::Vowel(vowel as u8)));
                        pos += 1;
                    }
                    None => tokens.push(Token::Unit(Unit::Vowel(0))),
                },
                None => tokens.push(Token::Unit(Unit::Vowel(0))),
            }
            continue;
        }

        let unit = if let Some(idx) = DEV_VOWELS.iter().position(|&c| c == ch) {
            Some(Unit::Vowel(idx as u8))
        } else {
            match ch {
                ANUSVARA => Some(Unit::Anusvara),
                VISARGA => Some(Unit::Visarga),
                CANDRABINDU => Some(Unit::Candrabindu),
                AVAGRAHA => Some(Unit::Avagraha),
                OM => Some(Unit::Om),
                DANDA => Some(Unit::Danda),
                DOUBLE_DANDA => Some(Unit::DoubleDanda),
                '०'..='९' => Some(Unit::Digit((ch as u32 - DEV_ZERO) as u8)),
                _ => None,
            }
        };

        match unit {
            Some(unit) => tokens.push(Token::Unit(unit)),
            // a stray sign with no consonant to attach to
            None if ch == VIRAMA || ch == NUKTA => {}
            None => tokens.push(Token::Raw(ch)),
        }
    }

    tokens
}

fn render_devanagari(tokens: &[Token]) -> String {
    let mut out = String::with_capacity(tokens.len() * 3);
    // the last consonant written still lacks a vowel
    let mut pending = false;

    for token in tokens {
        if let Token::Unit(Unit::Vowel(i)) = token {
            if pending {
                if let Some(matra) = DEV_MATRAS[*i as usize] {
                    out.push(matra);
                }
            } else {
                out.push(DEV_VOWELS[*i as usize]);
            }
            pending = false;
            continue;
        }

        if pending {
            out.push(VIRAMA);
            pending = false;
        }

        match token {
            Token::Raw(c) => out.push(*c),
            Token::Unit(unit) => match unit {
                Unit::Consonant(i) => {
                    out.push(DEV_CONSONANTS[*i as usize]);
                    pending = true;
                }
                Unit::Anusvara => out.push(ANUSVARA),
                Unit::Visarga => out.push(VISARGA),
                Unit::Candrabindu => out.push(CANDRABINDU),
                Unit::Avagraha => out.push(AVAGRAHA),
                Unit::Om => out.push(OM),
                Unit::Danda => out.push(DANDA),
                Unit::DoubleDanda => out.push(DOUBLE_DANDA),
                Unit::Digit(d) => {
                    if let Some(c) = char::from_u32(DEV_ZERO + *d as u32) {
                        out.push(c);
                    }
                }
                Unit::Vowel(_) => {}
            },
        }
    }

    if pending {
        out.push(VIRAMA);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_match_prefers_aspirate() {
        let tokens = parse("kha", Scheme::Iast);
        assert_eq!(
            tokens,
            vec![Token::Unit(Unit::Consonant(1)), Token::Unit(Unit::Vowel(0))]
        );
    }

    #[test]
    fn test_devanagari_inherent_vowel() {
        let tokens = parse_devanagari("कि");
        assert_eq!(
            tokens,
            vec![Token::Unit(Unit::Consonant(0)), Token::Unit(Unit::Vowel(2))]
        );

        let tokens = parse_devanagari("क");
        assert_eq!(
            tokens,
            vec![Token::Unit(Unit::Consonant(0)), Token::Unit(Unit::Vowel(0))]
        );
    }

    #[test]
    fn test_conjunct_gets_virama() {
        let tokens = parse("kṣa", Scheme::Iast);
        assert_eq!(render_devanagari(&tokens), "क्ष");
    }

    #[test]
    fn test_itrans_cluster_spelling() {
        let tokens = parse("x", Scheme::Itrans);
        assert_eq!(
            tokens,
            vec![Token::Unit(Unit::Consonant(KA)), Token::Unit(Unit::Consonant(SSA))]
        );
    }

    #[test]
    fn test_unknown_characters_pass_through() {
        let tokens = parse("a?", Scheme::Iast);
        assert_eq!(tokens[1], Token::Raw('?'));
    }
}
