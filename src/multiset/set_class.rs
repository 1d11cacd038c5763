//! Forte set classes and pitch class set analysis under Tn and TnI.

use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
};

use lazy_static::lazy_static;

// -------------------------------------------------------------------------------------------------

// prime forms, `T` = 10, `E` = 11
const TRICHORDS: [&str; 12] = [
    "012", "013", "014", "015", "016", "024", "025", "026", "027", "036", "037", "048",
];
const TETRACHORDS: [&str; 29] = [
    "0123", "0124", "0134", "0125", "0126", "0127", "0145", "0156", "0167", "0235", "0135",
    "0236", "0136", "0237", "0146", "0157", "0347", "0147", "0148", "0158", "0246", "0247",
    "0257", "0248", "0268", "0358", "0258", "0369", "0137",
];
const PENTACHORDS: [&str; 38] = [
    "01234", "01235", "01245", "01236", "01237", "01256", "01267", "02346", "01246", "01346",
    "02347", "01356", "01248", "01257", "01268", "01347", "01348", "01457", "01367", "01378",
    "01458", "01478", "02357", "01357", "02358", "02458", "01358", "02368", "01368", "01468",
    "01369", "01469", "02468", "02469", "02479", "01247", "03458", "01258",
];
const HEXACHORDS: [&str; 50] = [
    "012345", "012346", "012356", "012456", "012367", "012567", "012678", "023457", "012357",
    "013457", "012457", "012467", "013467", "013458", "012458", "014568", "012478", "012578",
    "013478", "014589", "023468", "012468", "023568", "013468", "013568", "013578", "013469",
    "013569", "013689", "013679", "013589", "024579", "023579", "013579", "02468T", "012347",
    "012348", "012378", "023458", "012358", "012368", "012369", "012568", "012569", "023469",
    "012469", "012479", "012579", "013479", "014679",
];

// Z related index pairs of tetrachords, pentachords and hexachords
const Z_PAIRS: [(usize, usize, usize); 19] = [
    (4, 15, 29),
    (5, 12, 36),
    (5, 17, 37),
    (5, 18, 38),
    (6, 3, 36),
    (6, 4, 37),
    (6, 6, 38),
    (6, 10, 39),
    (6, 11, 40),
    (6, 12, 41),
    (6, 13, 42),
    (6, 17, 43),
    (6, 19, 44),
    (6, 23, 45),
    (6, 24, 46),
    (6, 25, 47),
    (6, 26, 48),
    (6, 28, 49),
    (6, 29, 50),
];

fn parse_pcs(form: &str) -> Vec<u8> {
    form.chars()
        .map(|c| match c {
            'T' => 10,
            'E' => 11,
            _ => c.to_digit(10).unwrap_or(0) as u8,
        })
        .collect()
}

fn mask(pcs: &[u8], transposition: u8) -> u16 {
    pcs.iter()
        .fold(0u16, |mask, pc| mask | (1u16 << ((pc + transposition) % 12)))
}

fn complement(pcs: &[u8]) -> Vec<u8> {
    let complement = (0..12).filter(|pc| !pcs.contains(pc)).collect::<Vec<_>>();
    match complement.first() {
        Some(first) => complement.iter().map(|pc| pc - first).collect(),
        None => complement,
    }
}

/// Reflect a pitch class set within its span, keeping it in normal order from 0.
fn invert(pcs: &[u8]) -> Vec<u8> {
    let max = pcs.iter().copied().max().unwrap_or(0);
    let mut inverted = pcs.iter().map(|pc| max - pc).collect::<Vec<_>>();
    inverted.sort();
    inverted
}

lazy_static! {
    /// Prime forms (A forms) by cardinality. Index 0 of each list is set class index 1.
    static ref PRIMES: Vec<Vec<Vec<u8>>> = {
        let mut primes = vec![Vec::new(); 13];
        primes[0] = vec![vec![]];
        primes[1] = vec![vec![0]];
        primes[2] = (1..=6).map(|interval| vec![0, interval]).collect();
        primes[3] = TRICHORDS.iter().map(|f| parse_pcs(f)).collect();
        primes[4] = TETRACHORDS.iter().map(|f| parse_pcs(f)).collect();
        primes[5] = PENTACHORDS.iter().map(|f| parse_pcs(f)).collect();
        primes[6] = HEXACHORDS.iter().map(|f| parse_pcs(f)).collect();
        for cardinality in 7..=12 {
            primes[cardinality] = primes[12 - cardinality]
                .iter()
                .map(|pcs| complement(pcs))
                .collect();
        }
        primes
    };

    /// Set class and transposition of every pitch class set, keyed by its 12 bit mask.
    static ref SET_CLASSES: HashMap<u16, (SetClass, u8)> = {
        let mut set_classes = HashMap::new();
        for (cardinality, primes) in PRIMES.iter().enumerate() {
            for (index, prime) in primes.iter().enumerate() {
                let inverted = invert(prime);
                let prime_masks = (0..12).map(|t| mask(prime, t)).collect::<HashSet<_>>();
                let symmetric = (0..12).all(|t| prime_masks.contains(&mask(&inverted, t)));
                let mut forms = vec![(prime.clone(), Inversion::A)];
                if symmetric {
                    forms[0].1 = Inversion::Symmetric;
                } else {
                    forms.push((inverted, Inversion::B));
                }
                for (form, inversion) in forms {
                    for t in 0..12 {
                        let set_class = SetClass {
                            cardinality,
                            index: index + 1,
                            inversion,
                        };
                        set_classes.entry(mask(&form, t)).or_insert((set_class, t));
                    }
                }
            }
        }
        set_classes
    };
}

// -------------------------------------------------------------------------------------------------

/// Inversional variant of a set class under Tn classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Inversion {
    /// The prime form.
    A,
    /// The inversion of the prime form.
    B,
    /// Inversionally symmetric set, or a TnI classification.
    Symmetric,
}

/// A Forte set class: cardinality, index and inversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetClass {
    cardinality: usize,
    index: usize,
    inversion: Inversion,
}

impl SetClass {
    /// Create a set class from its Forte number. The inversion is corrected for
    /// symmetric sets, and defaults to the prime form otherwise.
    pub fn new(
        cardinality: usize,
        index: usize,
        inversion: Option<Inversion>,
    ) -> Result<Self, String> {
        let count = PRIMES.get(cardinality).map_or(0, Vec::len);
        if index == 0 || index > count {
            return Err(format!(
                "invalid set class '{}-{}': no such set class",
                cardinality, index
            ));
        }
        let prime = &PRIMES[cardinality][index - 1];
        let symmetric = SET_CLASSES
            .get(&mask(prime, 0))
            .is_some_and(|(set_class, _)| set_class.inversion == Inversion::Symmetric);
        let inversion = match (symmetric, inversion) {
            (true, _) => Inversion::Symmetric,
            (false, Some(Inversion::B)) => Inversion::B,
            (false, _) => Inversion::A,
        };
        Ok(Self {
            cardinality,
            index,
            inversion,
        })
    }

    /// Analyze a set of pitch space or pitch class values. Microtones are rounded, octaves
    /// and duplicates ignored. Returns the set class and the transposition of the set
    /// relative to the class' normal form.
    pub fn analyze<I: IntoIterator<Item = f64>>(pitches: I) -> (Self, u8) {
        let mask = pitches.into_iter().fold(0u16, |mask, ps| {
            mask | (1u16 << ((ps.round() as i64).rem_euclid(12)))
        });
        // all 4096 masks are covered by the table
        SET_CLASSES.get(&mask).copied().unwrap_or((
            Self {
                cardinality: 0,
                index: 1,
                inversion: Inversion::Symmetric,
            },
            0,
        ))
    }

    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn inversion(&self) -> Inversion {
        self.inversion
    }

    pub fn is_symmetric(&self) -> bool {
        self.inversion == Inversion::Symmetric
            || Self::new(self.cardinality, self.index, None)
                .is_ok_and(|sc| sc.inversion == Inversion::Symmetric)
    }

    /// The class under TnI equivalence, where A and B forms are not distinguished.
    #[must_use]
    pub fn to_tni(&self) -> Self {
        Self {
            inversion: Inversion::Symmetric,
            ..*self
        }
    }

    /// Pitch classes of the prime form.
    pub fn prime(&self) -> Vec<u8> {
        PRIMES[self.cardinality][self.index - 1].clone()
    }

    /// Pitch classes of this class' normal form: the prime form, or its inversion for B.
    pub fn pcs(&self) -> Vec<u8> {
        match self.inversion {
            Inversion::B => invert(&self.prime()),
            _ => self.prime(),
        }
    }

    /// Interval class vector.
    pub fn icv(&self) -> [u8; 6] {
        let pcs = self.prime();
        let mut icv = [0; 6];
        for (i, a) in pcs.iter().enumerate() {
            for b in &pcs[i + 1..] {
                let interval = (*b as i32 - *a as i32).rem_euclid(12);
                let class = interval.min(12 - interval);
                if class > 0 {
                    icv[class as usize - 1] += 1;
                }
            }
        }
        icv
    }

    /// The Z related set class, if any.
    pub fn z_relation(&self) -> Option<Self> {
        let (base, complemented) = if self.cardinality > 6 {
            (12 - self.cardinality, true)
        } else {
            (self.cardinality, false)
        };
        Z_PAIRS.iter().find_map(|(cardinality, a, b)| {
            if *cardinality != base {
                return None;
            }
            let other = if *a == self.index {
                *b
            } else if *b == self.index {
                *a
            } else {
                return None;
            };
            let cardinality = if complemented { 12 - base } else { base };
            Self::new(cardinality, other, Some(self.inversion)).ok()
        })
    }
}

impl TryFrom<&str> for SetClass {
    type Error = String;

    /// Parse Forte names such as `3-11`, `3-11B` or `4-z15`.
    fn try_from(s: &str) -> Result<Self, String> {
        let text = s.trim().to_ascii_lowercase();
        let (cardinality, rest) = text
            .split_once('-')
            .ok_or_else(|| format!("invalid set class '{}': missing '-'", s))?;
        let mut rest = rest.replace('z', "");
        let inversion = if rest.ends_with('b') {
            rest.pop();
            Some(Inversion::B)
        } else if rest.ends_with('a') {
            rest.pop();
            Some(Inversion::A)
        } else {
            None
        };
        let cardinality = cardinality
            .trim()
            .parse::<usize>()
            .map_err(|err| format!("invalid set class '{}': {}", s, err))?;
        let index = rest
            .trim()
            .parse::<usize>()
            .map_err(|err| format!("invalid set class '{}': {}", s, err))?;
        Self::new(cardinality, index, inversion)
    }
}

impl Display for SetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inversion = match self.inversion {
            Inversion::A => "A",
            Inversion::B => "B",
            Inversion::Symmetric => "",
        };
        write!(f, "{}-{}{}", self.cardinality, self.index, inversion)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn table_is_complete() {
        assert_eq!(SET_CLASSES.len(), 4096);
        let counts = PRIMES.iter().map(Vec::len).collect::<Vec<_>>();
        assert_eq!(counts, [1, 1, 6, 12, 29, 38, 50, 38, 29, 12, 6, 1, 1]);
    }

    #[test]
    fn analyze() {
        let (sc, t) = SetClass::analyze([3.0, 4.0, 5.0]);
        assert_eq!((sc.to_string(), t), ("3-1".to_string(), 3));
        assert_eq!(SetClass::analyze([0.0, 3.0, 7.0]).0.to_string(), "3-11A");
        assert_eq!(SetClass::analyze([0.0, 4.0, 7.0]).0.to_string(), "3-11B");
        assert_eq!(SetClass::analyze([2.0, 7.0, 9.0]).0.to_string(), "3-9");
        assert_eq!(SetClass::analyze([0.0, 4.0, 7.0]).0.to_tni().to_string(), "3-11");
        assert_eq!(SetClass::analyze([12.0, 24.0, -12.0]).0.to_string(), "1-1");
        assert_eq!(SetClass::analyze([0.1, 3.9, 7.0]).0.to_string(), "3-11B");
        assert_eq!(SetClass::analyze((0..12).map(f64::from)).0.to_string(), "12-1");
    }

    #[test]
    fn parse() -> Result<(), String> {
        let sc = SetClass::try_from("3-2")?;
        assert_eq!(sc.inversion(), Inversion::A);
        assert_eq!(sc.pcs(), vec![0, 1, 3]);
        assert_eq!(SetClass::try_from("3-2b")?.pcs(), vec![0, 2, 3]);
        assert_eq!(SetClass::try_from("3-12B")?.inversion(), Inversion::Symmetric);
        assert_eq!(SetClass::try_from("4-z15")?.pcs(), vec![0, 1, 4, 6]);
        assert_eq!(SetClass::try_from("7-1")?.pcs(), vec![0, 1, 2, 3, 4, 5, 6]);
        assert!(SetClass::try_from("3-13").is_err());
        assert!(SetClass::try_from("13-1").is_err());
        assert!(SetClass::try_from("3").is_err());
        Ok(())
    }

    #[test]
    fn vectors() -> Result<(), String> {
        assert_eq!(SetClass::try_from("3-11")?.icv(), [0, 0, 1, 1, 1, 0]);
        assert_eq!(SetClass::try_from("4-z29")?.icv(), [1, 1, 1, 1, 1, 1]);
        assert_eq!(
            SetClass::try_from("4-15")?.z_relation(),
            Some(SetClass::try_from("4-29")?)
        );
        assert_eq!(
            SetClass::try_from("8-29")?.z_relation(),
            Some(SetClass::try_from("8-15")?)
        );
        assert_eq!(SetClass::try_from("3-11")?.z_relation(), None);
        Ok(())
    }
}
