mod feature_extractor;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use clap::Parser;
use seqsvm::{Label, LearnParams, Pattern, TagRegistry, TestStats, Trainer, ViterbiDecoder};

use feature_extractor::FeatureExtractor;

#[derive(Parser, Debug)]
struct Args {
    /// Path to the training corpus (one sentence per line, word/TAG tokens)
    #[clap(long, value_parser)]
    corpus: PathBuf,

    /// Path to a held-out corpus to evaluate instead of tagging stdin
    #[clap(long, value_parser)]
    eval: Option<PathBuf>,

    /// Trade-off between margin size and training loss
    #[clap(long, value_parser, default_value_t = 1.0)]
    c: f64,
}

fn read_corpus(path: &Path) -> io::Result<Vec<Vec<(String, String)>>> {
    let f = BufReader::new(File::open(path)?);
    let mut sentences = vec![];
    for line in f.lines() {
        let line = line?;
        let mut sentence = vec![];
        for pair in line.split_whitespace() {
            let Some((word, tag)) = pair.rsplit_once('/') else {
                continue;
            };
            sentence.push((word.to_string(), tag.to_string()));
        }
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
    }
    Ok(sentences)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut registry = TagRegistry::new();
    let mut extractor = FeatureExtractor::new();
    let mut examples = vec![];
    for sentence in read_corpus(&args.corpus)? {
        let mut pattern = Pattern::new();
        let mut label = Label::new();
        for (word, tag) in &sentence {
            pattern.append_token(extractor.train_token(word));
            label.append_tag(registry.register_tag(tag));
        }
        examples.push((pattern, label));
    }
    eprintln!(
        "# of sentences: {}, # of tags: {}, # of features: {}",
        examples.len(),
        registry.num_tags(),
        extractor.feature_space_size()
    );

    let mut params = LearnParams::new(extractor.feature_space_size());
    params.c = args.c;
    let trainer = Trainer::new(params)?;
    let model = trainer.train(&examples, &registry)?;
    let decoder = ViterbiDecoder::new();

    if let Some(eval) = args.eval {
        let mut stats = TestStats::new();
        for sentence in read_corpus(&eval)? {
            let mut pattern = Pattern::new();
            let mut truth = Label::new();
            for (word, tag) in &sentence {
                pattern.append_token(extractor.test_token(word));
                truth.append_tag(registry.register_tag(tag));
            }
            stats.record(&truth, &model.predict(&pattern, &decoder));
        }
        eprintln!(
            "tokens: {}, correct: {}, accuracy: {:.4}",
            stats.num_tokens(),
            stats.num_correct_tags(),
            stats.accuracy()
        );
    } else {
        for line in io::stdin().lock().lines() {
            let line = line?;
            let words: Vec<&str> = line.split_whitespace().collect();
            let mut pattern = Pattern::new();
            for word in &words {
                pattern.append_token(extractor.test_token(word));
            }
            let predicted = model.predict(&pattern, &decoder);
            let mut tagged = vec![];
            for (i, word) in words.iter().enumerate() {
                tagged.push(format!(
                    "{}/{}",
                    word,
                    registry.tag_by_id(predicted.get_tag(i))?
                ));
            }
            println!("{}", tagged.join(" "));
        }
    }
    Ok(())
}
