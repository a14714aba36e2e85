//! Built-in phrase dictionary used by the first and last translation tiers.

use regex::{NoExpand, Regex, RegexBuilder};
use std::collections::HashMap;

const SPANISH: &[(&str, &str)] = &[
    ("slow loading time on mobile", "tiempo de carga lento en móvil"),
    ("frequent disconnection issues", "problemas de desconexión frecuentes"),
    ("delayed response from support team", "respuesta tardía del equipo de soporte"),
    ("payment gateway not working properly", "la pasarela de pago no funciona correctamente"),
    ("too many ads displayed during use", "demasiados anuncios mostrados durante el uso"),
    ("poor customer care service", "servicio de atención al cliente deficiente"),
    ("high-quality products", "productos de alta calidad"),
    ("timely updates and communication", "actualizaciones y comunicación oportunas"),
    ("fast and reliable delivery", "entrega rápida y confiable"),
    ("smooth payment process", "proceso de pago sin problemas"),
    ("customer", "cliente"),
    ("complaint", "queja"),
    ("issue", "problema"),
    ("problem", "problema"),
    ("error", "error"),
    ("slow", "lento"),
    ("fast", "rápido"),
    ("good", "bueno"),
    ("bad", "malo"),
    ("service", "servicio"),
    ("product", "producto"),
    ("quality", "calidad"),
    ("price", "precio"),
    ("support", "soporte"),
    ("technical", "técnico"),
    ("mobile", "móvil"),
    ("app", "aplicación"),
    ("website", "sitio web"),
    ("login", "iniciar sesión"),
    ("account", "cuenta"),
    ("payment", "pago"),
    ("refund", "reembolso"),
    ("delivery", "entrega"),
    ("update", "actualización"),
    ("notification", "notificación"),
];

const FRENCH: &[(&str, &str)] = &[
    ("slow loading time on mobile", "temps de chargement lent sur mobile"),
    ("frequent disconnection issues", "problèmes de déconnexion fréquents"),
    ("delayed response from support team", "réponse retardée de l'équipe de support"),
    ("payment gateway not working properly", "la passerelle de paiement ne fonctionne pas correctement"),
    ("too many ads displayed during use", "trop de publicités affichées pendant l'utilisation"),
    ("poor customer care service", "mauvais service à la clientèle"),
    ("high-quality products", "produits de haute qualité"),
    ("timely updates and communication", "mises à jour et communication opportunes"),
    ("fast and reliable delivery", "livraison rapide et fiable"),
    ("smooth payment process", "processus de paiement fluide"),
    ("customer", "client"),
    ("complaint", "plainte"),
    ("issue", "problème"),
    ("problem", "problème"),
    ("error", "erreur"),
    ("slow", "lent"),
    ("fast", "rapide"),
    ("good", "bon"),
    ("bad", "mauvais"),
    ("service", "service"),
    ("product", "produit"),
    ("quality", "qualité"),
    ("price", "prix"),
    ("support", "support"),
    ("technical", "technique"),
    ("mobile", "mobile"),
    ("app", "application"),
    ("website", "site web"),
    ("login", "se connecter"),
    ("account", "compte"),
    ("payment", "paiement"),
    ("refund", "remboursement"),
    ("delivery", "livraison"),
    ("update", "mise à jour"),
    ("notification", "notification"),
];

const HINDI: &[(&str, &str)] = &[
    ("slow loading time on mobile", "मोबाइल पर धीमा लोडिंग समय"),
    ("frequent disconnection issues", "लगातार डिस्कनेक्शन की समस्याएं"),
    ("delayed response from support team", "समर्थन टीम से विलंबित प्रतिक्रिया"),
    ("payment gateway not working properly", "भुगतान गेटवे ठीक से काम नहीं कर रहा है"),
    ("too many ads displayed during use", "उपयोग के दौरान बहुत सारे विज्ञापन दिखाए जाते हैं"),
    ("poor customer care service", "खराब ग्राहक सेवा"),
    ("high-quality products", "उच्च गुणवत्ता वाले उत्पाद"),
    ("timely updates and communication", "समय पर अद्यतन और संचार"),
    ("fast and reliable delivery", "तेज और विश्वसनीय डिलीवरी"),
    ("smooth payment process", "सहज भुगतान प्रक्रिया"),
    ("customer", "ग्राहक"),
    ("complaint", "शिकायत"),
    ("issue", "मुद्दा"),
    ("problem", "समस्या"),
    ("error", "त्रुटि"),
    ("slow", "धीमा"),
    ("fast", "तेज"),
    ("good", "अच्छा"),
    ("bad", "खराब"),
    ("service", "सेवा"),
    ("product", "उत्पाद"),
    ("quality", "गुणवत्ता"),
    ("price", "मूल्य"),
    ("support", "समर्थन"),
    ("technical", "तकनीकी"),
    ("mobile", "मोबाइल"),
    ("app", "ऐप"),
    ("website", "वेबसाइट"),
    ("login", "लॉग इन"),
    ("account", "खाता"),
    ("payment", "भुगतान"),
    ("refund", "धनवापसी"),
    ("delivery", "वितरण"),
    ("update", "अद्यतन"),
    ("notification", "सूचना"),
];

const GUJARATI: &[(&str, &str)] = &[
    ("slow loading time on mobile", "મોબાઇલ પર ધીમી લોડિંગ સમય"),
    ("frequent disconnection issues", "વારંવાર ડિસ્કનેક્શન સમસ્યાઓ"),
    ("delayed response from support team", "સપોર્ટ ટીમમાંથી વિલંબિત પ્રતિક્રિયા"),
    ("payment gateway not working properly", "ચુકવણી ગેટવે યોગ્ય રીતે કામ નથી કરી રહ્યું"),
    ("too many ads displayed during use", "ઉપયોગ દરમિયાન ઘણા બધા જાહેરાતો પ્રદર્શિત થાય છે"),
    ("poor customer care service", "નબળી ગ્રાહક સેવા"),
    ("high-quality products", "ઉચ્ચ-ગુણવત્તાના ઉત્પાદનો"),
    ("timely updates and communication", "સમયસર અપડેટ્સ અને સંચાર"),
    ("fast and reliable delivery", "ઝડપી અને વિશ્વસનીય ડિલિવરી"),
    ("smooth payment process", "સરળ ચુકવણી પ્રક્રિયા"),
    ("customer", "ગ્રાહક"),
    ("complaint", "ફરિયાદ"),
    ("issue", "મુદ્દો"),
    ("problem", "સમસ્યા"),
    ("error", "ભૂલ"),
    ("slow", "ધીમી"),
    ("fast", "ઝડપી"),
    ("good", "સારું"),
    ("bad", "ખરાબ"),
    ("service", "સેવા"),
    ("product", "ઉત્પાદન"),
    ("quality", "ગુણવત્તા"),
    ("price", "કિંમત"),
    ("support", "આધાર"),
    ("technical", "ટેકનિકલ"),
    ("mobile", "મોબાઇલ"),
    ("app", "એપ્લિકેશન"),
    ("website", "વેબસાઇટ"),
    ("login", "લૉગ ઇન"),
    ("account", "ખાતું"),
    ("payment", "ચુકવણી"),
    ("refund", "રિફંડ"),
    ("delivery", "વિતરણ"),
    ("update", "અપડેટ"),
    ("notification", "સૂચના"),
];

/// Characters stripped from a token before word lookup.
const WORD_PUNCTUATION: [char; 7] = ['.', ',', '!', '?', ';', ':', '"'];

struct PhrasePattern {
    pattern: Regex,
    replacement: &'static str,
}

/// Phrase and word entries for one target language.
pub struct LanguageTable {
    /// Whole-word patterns for every entry, longest phrase first.
    phrases: Vec<PhrasePattern>,
    words: HashMap<&'static str, &'static str>,
}

impl LanguageTable {
    fn new(code: &str, entries: &'static [(&'static str, &'static str)]) -> Self {
        let mut ordered: Vec<&(&str, &str)> = entries.iter().collect();
        ordered.sort_by_key(|(phrase, _)| std::cmp::Reverse(phrase.chars().count()));

        let phrases = ordered
            .into_iter()
            .filter_map(|&(phrase, replacement)| {
                let source = format!(r"\b{}\b", regex::escape(phrase));
                match RegexBuilder::new(&source).case_insensitive(true).build() {
                    Ok(pattern) => Some(PhrasePattern {
                        pattern,
                        replacement,
                    }),
                    Err(error) => {
                        tracing::warn!(code, phrase, error = %error, "Skipping dictionary phrase");
                        None
                    }
                }
            })
            .collect();

        Self {
            phrases,
            words: entries.iter().copied().collect(),
        }
    }

    /// Replace every whole occurrence of every entry, longest phrases first, so a phrase is
    /// consumed before its own words are considered.
    ///
    /// Returns the rewritten text and the number of distinct phrases that matched.
    pub fn replace_phrases(&self, text: &str) -> (String, usize) {
        let mut translated = text.to_string();
        let mut matched = 0;
        for PhrasePattern {
            pattern,
            replacement,
        } in &self.phrases
        {
            if pattern.is_match(&translated) {
                translated = pattern
                    .replace_all(&translated, NoExpand(replacement))
                    .into_owned();
                matched += 1;
            }
        }
        (translated, matched)
    }

    /// Translation for a single lowercase word, if the table has one.
    pub fn word(&self, word: &str) -> Option<&'static str> {
        self.words.get(word).copied()
    }
}

/// Dictionary tables keyed by two-letter language code.
pub struct PhraseDictionary {
    tables: HashMap<&'static str, LanguageTable>,
}

impl PhraseDictionary {
    /// Dictionary with the built-in Spanish, French, Hindi, and Gujarati tables.
    pub fn builtin() -> Self {
        let tables = [
            ("es", SPANISH),
            ("fr", FRENCH),
            ("hi", HINDI),
            ("gu", GUJARATI),
        ]
        .into_iter()
        .map(|(code, entries)| (code, LanguageTable::new(code, entries)))
        .collect();
        Self { tables }
    }

    /// Table for a normalized language code.
    pub fn table(&self, code: &str) -> Option<&LanguageTable> {
        self.tables.get(code)
    }
}

/// Substitute dictionary words token by token, preserving whitespace exactly.
///
/// Each non-whitespace token is stripped of `.,!?;:"` and lowercased for lookup.
/// A hit replaces the whole token; a miss keeps the original token untouched. Returns the
/// rewritten text and the number of tokens replaced.
pub fn translate_word_by_word(text: &str, table: Option<&LanguageTable>) -> (String, usize) {
    let mut output = String::with_capacity(text.len());
    let mut replaced = 0;

    for token in split_preserving_whitespace(text) {
        if token.chars().all(char::is_whitespace) {
            output.push_str(token);
            continue;
        }
        let cleaned: String = token
            .chars()
            .filter(|c| !WORD_PUNCTUATION.contains(c))
            .collect::<String>()
            .to_lowercase();
        match table.and_then(|table| table.word(&cleaned)) {
            Some(translation) => {
                output.push_str(translation);
                replaced += 1;
            }
            None => output.push_str(token),
        }
    }

    (output, replaced)
}

/// Split text into alternating whitespace runs and non-whitespace tokens.
fn split_preserving_whitespace(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_whitespace: Option<bool> = None;

    for (offset, c) in text.char_indices() {
        let is_space = c.is_whitespace();
        if in_whitespace.is_some_and(|current| current != is_space) {
            tokens.push(&text[start..offset]);
            start = offset;
        }
        in_whitespace = Some(is_space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}
