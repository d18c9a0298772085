use crate::models::{QuizItem, Tier};

/// The built-in question catalog: ten items per tier
pub fn default_items() -> Vec<QuizItem> {
    let bronze = [
        ("Кой е авторът на 'Под игото'?", ["Иван Вазов", "Христо Ботев", "Алеко Константинов", "Елин Пелин"], "Иван Вазов е авторът на 'Под игото' - най-известният български роман."),
        ("Кой жанр е 'До Чикаго и назад'?", ["Пътепис", "Роман", "Поема", "Пиеса"], "'До Чикаго и назад' е пътепис на Алеко Константинов."),
        ("Кое произведение започва с 'Вазов, ти си народен поет'?", ["На прощаване", "Обесването на Васил Левски", "Хаджи Димитър", "До Чикаго и назад"], "'На прощаване' на Христо Ботев започва с тези стихове."),
        ("Кой е герой от 'Под игото'?", ["Боримечката", "Киро", "Бай Ганьо", "Хаджи Димитър"], "Боримечката е важен герой в 'Под игото' на Иван Вазов."),
        ("Кой е автор на 'История славянобългарска'?", ["Паисий Хилендарски", "Софроний Врачански", "Григорий Цамблак", "Неофит Рилски"], "Паисий Хилендарски е автор на 'История славянобългарска'."),
        ("Кой е написал поемата 'Хаджи Димитър'?", ["Христо Ботев", "Иван Вазов", "Пенчо Славейков", "Пейо Яворов"], "Христо Ботев е автор на поемата 'Хаджи Димитър'."),
        ("Кое произведение е написано от Алеко Константинов?", ["Бай Ганьо", "Под игото", "Епопея на забравените", "Немили-недраги"], "'Бай Ганьо' е най-известното произведение на Алеко Константинов."),
        ("Кой е авторът на 'Чичовци'?", ["Иван Вазов", "Елин Пелин", "Йордан Йовков", "Христо Ботев"], "Иван Вазов е автор на разказа 'Чичовци'."),
        ("Какъв е жанърът на 'История славянобългарска'?", ["Исторически труд", "Роман", "Поема", "Пътепис"], "'История славянобългарска' е исторически труд от Паисий Хилендарски."),
        ("Кой герой е от 'Бай Ганьо'?", ["Ганьо Сомов", "Огнянов", "Боримечката", "Хаджи Димитър"], "Ганьо Сомов е главният герой в 'Бай Ганьо' на Алеко Константинов."),
    ];

    let silver = [
        ("Коя тема доминира в 'До Чикаго и назад'?", ["Българска емиграция", "Селски живот", "Исторически събития", "Религия"], "Българската емиграция е централна тема в произведението."),
        ("Кой символ се използва в 'Хаджи Димитър'?", ["Залез", "Орел", "Роза", "Кръст"], "Залезът е основен символ в поемата 'Хаджи Димитър'."),
        ("Кой е разказвачът в 'Чичовци'?", ["Авторът", "Кирица", "Бай Ганьо", "Чичото"], "Авторът е разказвачът в 'Чичовци' на Иван Вазов."),
        ("Кое е основното конфликтно ядро в 'Под игото'?", ["Борбата за свобода", "Семейни раздели", "Икономическа криза", "Религиозен спор"], "Борбата за свобода е централният конфликт в романа."),
        ("Кой стилен похват е характерен за Вазовия епос?", ["Историзъм", "Сюрреализъм", "Абсурд", "Гротеска"], "Историзмът е характерен похват за Вазов."),
        ("Каква е ролята на природата в 'Хаджи Димитър'?", ["Символ на вечността", "Фон на действието", "Конфликтен елемент", "Източник на конфликт"], "Природата в 'Хаджи Димитър' е символ на вечността."),
        ("Коя е основната тема в 'Опълченците на Шипка'?", ["Героизъм", "Любов", "Природа", "Семейство"], "Героизмът е основната тема в поемата 'Опълченците на Шипка'."),
        ("Какъв е основният тон в 'Бай Ганьо'?", ["Сатиричен", "Лиричен", "Трагичен", "Епичен"], "Сатиричният тон е характерен за 'Бай Ганьо'."),
        ("Кой е основният конфликт в 'Немили-недраги'?", ["Социална несправедливост", "Любовна драма", "Исторически сблъсък", "Религиозен спор"], "Социалната несправедливост е основният конфликт в 'Немили-недраги'."),
        ("Какъв е жанърът на 'Епопея на забравените'?", ["Поетичен цикъл", "Роман", "Пиеса", "Разказ"], "'Епопея на забравените' е поетичен цикъл от Иван Вазов."),
    ];

    let gold = [
        ("Кой мотив свързва 'Хаджи Димитър' и 'Обесването на Васил Левски'?", ["Жертвеност", "Любов", "Природа", "Семейство"], "Жертвеността е общият мотив в двете произведения."),
        ("Какво представлява композицията на 'Епопея на забравените'?", ["Цикъл от поеми", "Роман", "Пиеса", "Разказ"], "'Епопея на забравените' е цикъл от поеми на Иван Вазов."),
        ("Кой е литературният източник на образа на Боримечката?", ["Фолклор", "История", "Митология", "Библия"], "Образът е взет от българския фолклор."),
        ("Коя философска идея се крие в 'До Чикаго и назад'?", ["Идентичност", "Съдба", "Смърт", "Любов"], "Идентичността е централната философска идея."),
        ("Кой е поетичният метафорен център в 'Хаджи Димитър'?", ["Безсмъртие", "Природа", "Война", "Семейство"], "Безсмъртието е поетичният център на поемата."),
        ("Каква е ролята на Рада в 'Под игото'?", ["Символ на чистотата", "Бунтовник", "Предател", "Жертва на обществото"], "Рада е символ на чистотата в 'Под игото'."),
        ("Кой е основният художествен похват в 'Бай Ганьо'?", ["Сатира", "Лирика", "Епос", "Драма"], "Сатирата е основният похват в 'Бай Ганьо'."),
        ("Каква е ролята на природата в 'Епопея на забравените'?", ["Олицетворение на борбата", "Фон на действието", "Символ на любовта", "Източник на конфликт"], "Природата е олицетворение на борбата в 'Епопея на забравените'."),
        ("Кой е основният конфликт в 'Опълченците на Шипка'?", ["Героизъм срещу страх", "Любов срещу дълг", "Природа срещу човек", "Семейство срещу общество"], "Героизмът срещу страха е основният конфликт в поемата."),
        ("Коя е философската идея в 'Немили-недраги'?", ["Човешкото страдание", "Любовта", "Природата", "Съдбата"], "Човешкото страдание е философската идея в 'Немили-недраги'."),
    ];

    // The catalog lists the correct option first; sessions shuffle options on load.
    [(Tier::Bronze, bronze), (Tier::Silver, silver), (Tier::Gold, gold)]
        .into_iter()
        .flat_map(|(tier, entries)| {
            entries
                .into_iter()
                .map(move |(question, options, explanation)| QuizItem::new(question, options, 0, tier, explanation))
        })
        .collect()
}

/// Essay topics drawn once per session
pub fn default_topics() -> Vec<String> {
    [
        "Силата на знанието в съвременния свят",
        "Литературата като огледало на обществото",
        "Героизмът в българската литература",
        "Свободата и робството в българското Възраждане",
        "Природата като символ в поезията",
        "Паметта и историята в литературата",
        "Чуждото и своето в 'До Чикаго и назад'",
        "Борбата за национална идентичност",
        "Смисълът на жертвата в поезията",
        "Бъдещето на българската литература",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}
