use clap::Parser;
use tracing::info;

use rust_page_scaffold::dom::{Dom, ElementId, MemoryDom, Rect};
use rust_page_scaffold::page::{HostEnvironment, Page, PageEvent};
use rust_page_scaffold::particles::{ManualFrames, ParticleField, RecordingHost};
use rust_page_scaffold::quality::StaticProbe;
use rust_page_scaffold::storage::MemoryStorage;
use rust_page_scaffold::{logging, InitializationOptions};

/// Headless run of a sample portrait page: scrolls it, ticks timers and
/// drives the particle backdrop.
#[derive(Parser)]
#[command(name = "page-smoke")]
#[command(version)]
struct Args {
    /// Simulated seconds to run
    #[arg(long, default_value = "12")]
    seconds: f32,

    /// Animation frames per simulated second
    #[arg(long, default_value = "60")]
    fps: f32,

    /// Viewport width in CSS pixels
    #[arg(long, default_value = "1280")]
    width: f32,

    /// Viewport height in CSS pixels
    #[arg(long, default_value = "720")]
    height: f32,

    /// Scroll speed in CSS pixels per simulated second
    #[arg(long, default_value = "300")]
    scroll_speed: f32,
}

struct SamplePage {
    dom: MemoryDom,
    /// Elements that move with the scroll, with their document-space rects.
    layout: Vec<(ElementId, Rect)>,
}

fn sample_page() -> SamplePage {
    let mut dom = MemoryDom::new();
    let body = dom.body();
    let mut layout = Vec::new();

    let header = dom.add(body, "header", "");
    dom.add(header, "button", "nav-toggle");
    dom.add(header, "ul", "nav-menu");
    dom.add_with_attrs(header, "a", "", &[("href", "#works")]);

    let bio = dom.add(body, "p", "bio-paragraph");
    layout.push((bio, Rect::new(0.0, 120.0, 800.0, 240.0)));

    let quotes = dom.add(body, "section", "quotes-section");
    layout.push((quotes, Rect::new(0.0, 420.0, 1280.0, 320.0)));
    for _ in 0..3 {
        dom.add(quotes, "blockquote", "quote");
        dom.add(quotes, "span", "dot");
    }
    dom.add(quotes, "button", "quote-prev");
    dom.add(quotes, "button", "quote-next");

    let works = dom.add_with_attrs(body, "section", "", &[("id", "works")]);
    for i in 0..6 {
        let card = dom.add(works, "article", "work-card");
        layout.push((card, Rect::new(0.0, 900.0 + i as f32 * 320.0, 600.0, 280.0)));
    }

    let stat = dom.add(body, "div", "theater-stat");
    let number = dom.add(stat, "span", "stat-number");
    dom.set_text(number, "120+");
    layout.push((stat, Rect::new(0.0, 3_000.0, 300.0, 120.0)));

    let img = dom.add_with_attrs(body, "img", "", &[("loading", "lazy"), ("data-src", "portrait.jpg")]);
    layout.push((img, Rect::new(0.0, 3_300.0, 400.0, 500.0)));
    dom.add_with_attrs(body, "a", "", &[("href", "https://uk.wikipedia.org/")]);

    for (el, rect) in &layout {
        dom.set_rect(*el, *rect);
    }
    SamplePage { dom, layout }
}

fn main() {
    logging::init("info");
    let args = Args::parse();
    let frame_ms = (1_000.0 / args.fps.max(1.0)) as u64;
    let total_ms = (args.seconds.max(0.0) * 1_000.0) as u64;

    let SamplePage { dom, layout } = sample_page();
    let env = HostEnvironment {
        hostname: "portraits.example".to_string(),
        viewport: (args.width, args.height),
        ..HostEnvironment::default()
    };
    let mut page = Page::new(dom, MemoryStorage::new(), env);
    let options = InitializationOptions {
        counter_selectors: vec![".theater-stat".to_string()],
        performance_monitoring: true,
        time_on_page_key: Some("smoke_time_spent".to_string()),
        ..InitializationOptions::default()
    };
    page.initialize(options);

    let probe = StaticProbe {
        viewport: (args.width, args.height),
        ..StaticProbe::default()
    };
    let mut frames = ManualFrames::default();
    let mut field = ParticleField::new(&probe, &mut RecordingHost, 0x5eed);
    if let Some(field) = field.as_mut() {
        field.start(&mut frames);
    }

    println!(
        "Page smoke run: {:.1}s @ {:.1}fps, viewport {}x{}",
        args.seconds, args.fps, args.width, args.height
    );

    let mut now = 0;
    let mut next_report = 0;
    let mut loaded = false;
    while now < total_ms {
        now += frame_ms.max(1);
        let offset = args.scroll_speed * now as f32 / 1_000.0;
        for (el, rect) in &layout {
            page.dom_mut()
                .set_rect(*el, Rect::new(rect.x, rect.y - offset, rect.width, rect.height));
        }

        page.advance_to(now);
        // Load timing is only recorded once the deferred phase has wired it.
        if !loaded && page.state().deferred_ran() {
            loaded = true;
            page.dispatch(PageEvent::Load {
                navigation_start_ms: 0,
                load_event_end_ms: now,
            });
        }
        page.dispatch(PageEvent::Scroll);
        page.animation_frame(now);
        if let Some(field) = field.as_mut() {
            if frames.take_next().is_some() {
                field.frame(now, page.is_hidden(), &mut frames);
            }
        }

        if now >= next_report {
            next_report += 2_000;
            let quote = page.carousel().map(|c| c.state().index());
            let revealed = page.reveal().map_or(0, |r| r.revealed().len());
            info!(t_ms = now, ?quote, revealed, "page tick");
        }
    }

    page.dispatch(PageEvent::BeforeUnload);
    let revealed = page.reveal().map_or(0, |r| r.revealed().len());
    let tracked = page.reveal().map_or(0, |r| r.tracked());
    let counters = page.counters().map_or(0, |c| c.finished());
    let stored: Option<u64> = page.storage().get("smoke_time_spent");
    println!("Revealed {revealed}/{tracked} elements, {counters} counters finished");
    println!(
        "Load time: {:?} ms, time on page stored: {:?} s",
        page.performance().and_then(|p| p.load_time_ms()),
        stored
    );
    match &field {
        Some(field) => println!(
            "Particles: {} ({:?}), {} frames drawn",
            field.batch().len(),
            field.tier(),
            field.surface().clears
        ),
        None => println!("Particles: disabled"),
    }
    page.dispose();
    if let Some(field) = field.as_mut() {
        field.teardown(&mut frames);
    }
}
