use langid_core::model::encoder::encode;
use langid_core::model::identifier::LanguageIdentifier;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // List the model directories in "data" (any sub-directory holding a model.json)
    let models = LanguageIdentifier::list_models("./data")?;
    println!("Available models: {}", models.join(", "));

    // The encoder can be used on its own: one count per vocabulary n-gram,
    // overlapping matches included
    println!("{:?}", encode("abcabc", &["a", "ab", "abc", "xyz"]));
    println!("{:?}", encode("aaa", &["aa"]));

    // Load a model: vocabulary.json, languages.json and the TensorFlow.js model.
    // The converted network is cached in model.cache for the next run
    let identifier = LanguageIdentifier::open("./data", "demo")?;
    println!(
        "Loaded '{}' ({} n-grams, {} languages)",
        identifier.name(),
        identifier.vocabulary().len(),
        identifier.languages().len()
    );

    let texts = [
        "The quick brown fox jumps over the lazy dog",
        "Le chat est sur la table de la cuisine",
        "Der Hund und die Katze schlafen in der Sonne",
        "El perro y el gato duermen en la casa",
        "",
    ];

    // Guess each text and print every language with its probability
    for text in texts {
        let prediction = identifier.guess(text)?;
        println!("\n\"{}\"", text);
        println!("{}", prediction.render());
        if let Some(best) = prediction.best() {
            println!("-> {}", best.language);
        }
    }

    // Batch guessing encodes the texts in parallel
    let predictions = identifier.guess_batch(&texts)?;
    for (text, prediction) in texts.iter().zip(&predictions) {
        match prediction.best() {
            Some(best) => println!("{:<50} {}", text, best.language),
            None => println!("{:<50} ?", text),
        }
    }

    Ok(())
}
