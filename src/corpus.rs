//! Built-in reference corpora
//!
//! Fictional company profiles and a small financial glossary. Each entry is
//! embedded as one document.

pub const COMPANY_PROFILES: &[&str] = &[
    r#"# TechVision Inc. (TVIX)

Industry: Technology
Founded: 2005
Headquarters: San Francisco, CA

TechVision is a leading AI and machine learning company specializing in computer vision solutions. Their flagship product, VisionCore, is used by major automotive manufacturers for autonomous driving systems.

Recent developments:
- Announced partnership with AutoDrive to enhance autonomous vehicle safety features
- Introduced new AI chip with 40% better performance than previous generation
- Expanding into healthcare imaging with acquisition of MedSight Technologies

Financial highlights:
- Annual revenue: $3.2B (up 18% YoY)
- Profit margin: 22%
- R&D spending: $780M (24% of revenue)"#,
    r#"# GreenEnergy Corp (GRNE)

Industry: Renewable Energy
Founded: 2010
Headquarters: Austin, TX

GreenEnergy specializes in solar and wind energy solutions with a focus on energy storage technology. Their battery systems are used in both residential and commercial applications.

Recent developments:
- Launched next-generation home battery with 30% increased capacity
- Secured $500M contract to build solar farm in Nevada
- Expanding manufacturing facilities in Texas and Arizona

Financial highlights:
- Annual revenue: $1.8B (up 25% YoY)
- Profit margin: 14%
- Net cash position: $620M"#,
    r#"# HealthPlus Inc. (HLTH)

Industry: Healthcare
Founded: 1998
Headquarters: Boston, MA

HealthPlus develops innovative medical devices and digital health platforms. Their diabetes management system has captured significant market share in the US.

Recent developments:
- FDA approval for next-generation continuous glucose monitor
- Expanded telemedicine platform to include mental health services
- Strategic partnership with major insurance providers

Financial highlights:
- Annual revenue: $2.4B (up 12% YoY)
- Profit margin: 18%
- International sales: 35% of revenue"#,
    r#"# DigitalFinance Group (DFG)

Industry: Fintech
Founded: 2015
Headquarters: New York, NY

DigitalFinance provides blockchain-based payment solutions and digital banking services to both consumers and businesses.

Recent developments:
- Launched small business lending platform with AI-powered risk assessment
- Obtained banking license in European Union
- Integrated with major e-commerce platforms

Financial highlights:
- Annual revenue: $950M (up 40% YoY)
- Profit margin: 8%
- User base: 12 million (up 30% YoY)"#,
    r#"# ConsumerBrands Corp (CNBC)

Industry: Consumer Goods
Founded: 1975
Headquarters: Chicago, IL

ConsumerBrands manages a portfolio of household products, personal care items, and food brands with strong presence in North America and Europe.

Recent developments:
- Sustainability initiative to make all packaging recyclable by 2026
- Expansion into Asian markets
- Divested underperforming snack food division

Financial highlights:
- Annual revenue: $8.5B (up 5% YoY)
- Profit margin: 15%
- Dividend yield: 3.2%"#,
];

pub const GLOSSARY: &[&str] = &[
    "Bull Market: A period in which prices of securities rise or are expected to rise, typically by 20% or more from recent lows, accompanied by investor optimism and strong economic indicators.",
    "Bear Market: A period in which prices of securities fall 20% or more from recent highs, usually accompanied by widespread pessimism and negative investor sentiment.",
    "Price-to-Earnings Ratio (P/E): A valuation ratio computed as a company's share price divided by its earnings per share. A high P/E can signal growth expectations or overvaluation.",
    "Dividend Yield: Annual dividends per share divided by the share price, expressed as a percentage. It shows how much cash flow an investor receives for each dollar invested.",
    "Market Capitalization: The total market value of a company's outstanding shares, calculated as share price multiplied by the number of shares outstanding.",
    "Volatility: A statistical measure of the dispersion of returns for a security or index, often measured by the standard deviation of returns. Higher volatility means larger price swings.",
    "Exchange-Traded Fund (ETF): A pooled investment fund that trades on a stock exchange like a single stock and usually tracks an index, sector, commodity, or other asset.",
    "Short Selling: Selling borrowed shares with the intention of buying them back later at a lower price, profiting from a decline in the security's price.",
    "Earnings Per Share (EPS): A company's net profit divided by the number of common shares outstanding, indicating profitability on a per-share basis.",
    "Liquidity: How quickly and easily an asset can be bought or sold in the market without significantly affecting its price.",
];
